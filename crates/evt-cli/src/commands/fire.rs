//! Fire command for one-off single and volume events.

use std::io::Write;

use anyhow::{Context, Result};
use evt_core::Tracker;

use crate::cli::FireArgs;
use crate::commands::Delivery;

pub async fn run<W: Write>(
    writer: &mut W,
    tracker: &Tracker,
    delivery: &Delivery,
    args: &FireArgs,
) -> Result<()> {
    tracker
        .fire(&args.tag, args.volume)
        .with_context(|| format!("failed to fire event {:?}", args.tag))?;
    delivery.finish(writer).await
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use evt_core::{ManualClock, Timestamp};
    use insta::assert_snapshot;

    use super::*;

    fn fire_args(tag: &str, volume: Option<i64>) -> FireArgs {
        FireArgs {
            tag: tag.to_string(),
            volume,
        }
    }

    #[tokio::test]
    async fn fire_previews_single_event() {
        let delivery = Delivery::preview(Arc::new(ManualClock::new(Timestamp::from_secs(
            1_700_000_000,
        ))));
        let tracker = delivery.tracker();

        let mut output = Vec::new();
        run(&mut output, &tracker, &delivery, &fire_args("page_view", None))
            .await
            .unwrap();

        let output = String::from_utf8(output).unwrap();
        assert_snapshot!(output.trim_end(), @r#"{"version":"1.0","events":[{"tag":"page_view","whenArised":1700000000}],"whenSent":1700000000}"#);
    }

    #[tokio::test]
    async fn fire_previews_volume_event() {
        let delivery = Delivery::preview(Arc::new(ManualClock::new(Timestamp::from_secs(5))));
        let tracker = delivery.tracker();

        let mut output = Vec::new();
        run(&mut output, &tracker, &delivery, &fire_args("upload", Some(2048)))
            .await
            .unwrap();

        let output = String::from_utf8(output).unwrap();
        assert_snapshot!(output.trim_end(), @r#"{"version":"1.0","events":[{"tag":"upload","whenArised":5,"volume":2048}],"whenSent":5}"#);
    }

    #[tokio::test]
    async fn fire_rejects_negative_volume() {
        let delivery = Delivery::preview(Arc::new(ManualClock::default()));
        let tracker = delivery.tracker();

        let mut output = Vec::new();
        let err = run(&mut output, &tracker, &delivery, &fire_args("upload", Some(-1)))
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("volume must be non-negative"));
        assert!(output.is_empty());
    }
}
