use crate::pager::TerminationReason;
use std::fmt;
use std::time::Duration;

/// Outcome of a single crawl run
#[derive(Debug, Clone)]
pub struct CrawlSummary {
    /// Target the run crawled
    pub target: String,

    /// Kind label of the target (profile, hashtag, channel, page)
    pub kind: String,

    /// Items newly committed to the progress file this run
    pub accepted: u64,

    /// Media files downloaded this run
    pub media_downloaded: u64,

    /// Why the run ended
    pub termination: TerminationReason,

    /// Wall-clock duration of the run
    pub elapsed: Duration,
}

impl fmt::Display for CrawlSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}): {} new items, {} media files, {} after {:.1}s",
            self.target,
            self.kind,
            self.accepted,
            self.media_downloaded,
            self.termination,
            self.elapsed.as_secs_f64()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_display() {
        let summary = CrawlSummary {
            target: "alice".to_string(),
            kind: "profile".to_string(),
            accepted: 12,
            media_downloaded: 3,
            termination: TerminationReason::EndOfFeed,
            elapsed: Duration::from_millis(2500),
        };
        let text = summary.to_string();
        assert!(text.contains("alice (profile)"));
        assert!(text.contains("12 new items"));
        assert!(text.contains("end_of_feed"));
    }
}
