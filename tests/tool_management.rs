//! Version queries and self-update through stub tools.

#![cfg(unix)]

mod common;

use common::StubTool;
use time::{Date, Month};
use ytdlp_resolver::UrlResolver;

#[tokio::test]
async fn version_is_parsed_from_the_first_line() {
    let stub = StubTool::new(
        r#"case "$1" in
  --version) printf '2024.08.06\n' ;;
  *) exit 64 ;;
esac"#,
    );

    let version = stub.resolver().tool_version().await.unwrap();

    assert_eq!(version.raw, "2024.08.06");
    assert_eq!(
        version.released,
        Some(Date::from_calendar_date(2024, Month::August, 6).unwrap())
    );
}

#[tokio::test]
async fn failing_version_query_yields_none() {
    let stub = StubTool::new("echo boom >&2; exit 1");
    assert!(stub.resolver().tool_version().await.is_none());
}

#[tokio::test]
async fn tool_info_reports_path_and_version() {
    let stub = StubTool::new("echo 2025.01.15");

    let info = stub.resolver().tool_info().await;

    assert!(info.is_available);
    assert_eq!(info.name, "yt-dlp");
    assert_eq!(info.version.as_deref(), Some("2025.01.15"));
    assert_eq!(info.path, Some(stub.path().display().to_string()));
}

#[tokio::test]
async fn update_succeeds_on_zero_exit() {
    let stub = StubTool::new(
        r#"case "$1" in
  -U)
    echo "Updating to stable@2024.10.07 from yt-dlp/yt-dlp"
    echo "Updated yt-dlp to stable@2024.10.07" ;;
  *) exit 64 ;;
esac"#,
    );

    let resolver = stub.resolver();
    let updater: &dyn UrlResolver = &resolver;
    updater.update_tool(None).await.unwrap();
}

#[tokio::test]
async fn update_fails_on_nonzero_exit() {
    let stub = StubTool::new(r#"echo "ERROR: Unable to write to /usr/bin/yt-dlp" >&2; exit 1"#);

    let err = stub.resolver().update_tool(None).await.unwrap_err();

    assert_eq!(err.to_string(), "ERROR: Unable to write to /usr/bin/yt-dlp");
}
