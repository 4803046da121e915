// FormatSelector - builds yt-dlp `-f` selector strings
//
// A selector is a slash-delimited list of alternatives; yt-dlp walks it left
// to right and takes the first one that matches, so the order below is part
// of the contract:
// - Live: combined streams, avoiding HLS first, then any protocol
// - VOD: separate mp4 video + m4a audio, then progressively looser combined mp4
// - Every chain ends in plain `best`

use super::models::Quality;

pub struct FormatSelector;

impl FormatSelector {
    /// Selector for a pixel-height cap (0 = none) and live/VOD status
    pub fn plan(height: u32, is_live: bool) -> String {
        match (is_live, height) {
            (true, 0) => "best[protocol!=m3u8]/best[protocol!=m3u8_native]/best".to_string(),
            (true, h) => format!(
                "best[height<={h}][protocol!=m3u8]/best[height<={h}][protocol!=m3u8_native]/best[height<={h}]/best"
            ),
            (false, 0) => "bestvideo[ext=mp4][protocol!=m3u8]+bestaudio[ext=m4a]\
                           /best[ext=mp4][protocol!=m3u8]\
                           /best[ext=mp4]\
                           /best"
                .to_string(),
            (false, h) => format!(
                "bestvideo[height<={h}][ext=mp4][protocol!=m3u8]+bestaudio[ext=m4a]\
                 /best[height<={h}][ext=mp4][protocol!=m3u8]\
                 /best[height<={h}][ext=mp4]\
                 /best[ext=mp4]\
                 /best"
            ),
        }
    }

    pub fn for_quality(quality: Quality, is_live: bool) -> String {
        Self::plan(quality.height(), is_live)
    }

    /// Split a selector into its alternatives, in evaluation order
    pub fn alternatives(selector: &str) -> Vec<&str> {
        selector.split('/').collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIERS: [Quality; 7] = [
        Quality::Auto,
        Quality::Low,
        Quality::Medium,
        Quality::High,
        Quality::Full,
        Quality::Qhd,
        Quality::Uhd4k,
    ];

    #[test]
    fn vod_with_height_matches_fallback_chain() {
        assert_eq!(
            FormatSelector::plan(720, false),
            "bestvideo[height<=720][ext=mp4][protocol!=m3u8]+bestaudio[ext=m4a]\
             /best[height<=720][ext=mp4][protocol!=m3u8]\
             /best[height<=720][ext=mp4]\
             /best[ext=mp4]\
             /best"
        );
    }

    #[test]
    fn vod_without_height_omits_height_predicate() {
        assert_eq!(
            FormatSelector::plan(0, false),
            "bestvideo[ext=mp4][protocol!=m3u8]+bestaudio[ext=m4a]/best[ext=mp4][protocol!=m3u8]/best[ext=mp4]/best"
        );
    }

    #[test]
    fn live_with_height_prefers_non_hls() {
        assert_eq!(
            FormatSelector::plan(1080, true),
            "best[height<=1080][protocol!=m3u8]/best[height<=1080][protocol!=m3u8_native]/best[height<=1080]/best"
        );
    }

    #[test]
    fn live_without_height() {
        assert_eq!(
            FormatSelector::plan(0, true),
            "best[protocol!=m3u8]/best[protocol!=m3u8_native]/best"
        );
    }

    #[test]
    fn out_of_range_height_never_reaches_the_selector() {
        let selector = FormatSelector::for_quality(Quality::Height(99_999), false);
        assert!(selector.contains("[height<=4320]"), "{selector}");
        assert!(!selector.contains("99999"), "{selector}");
    }

    #[test]
    fn every_chain_is_well_formed() {
        for quality in TIERS {
            for is_live in [false, true] {
                let selector = FormatSelector::for_quality(quality, is_live);
                let alts = FormatSelector::alternatives(&selector);

                assert!(alts.len() >= 3, "{selector}");
                assert!(alts.iter().all(|a| !a.is_empty()), "{selector}");
                assert!(!selector.contains(char::is_whitespace), "{selector}");
                assert_eq!(*alts.last().unwrap(), "best", "{selector}");

                let first = alts[0];
                assert!(first.contains("[protocol!=m3u8]"), "{selector}");
                if quality.height() > 0 {
                    assert!(
                        first.contains(&format!("[height<={}]", quality.height())),
                        "{selector}"
                    );
                }
                if !is_live {
                    assert!(first.contains("[ext=mp4]"), "{selector}");
                }

                // constraints only ever loosen along the chain
                let counts: Vec<usize> = alts.iter().map(|a| a.matches('[').count()).collect();
                assert!(counts.windows(2).all(|w| w[0] >= w[1]), "{selector}");
            }
        }
    }
}
