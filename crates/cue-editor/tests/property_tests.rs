//! Randomized transcript synchronizer properties.

use cue_core::parser::transcript;
use cue_core::{TimeRange, Timeline};
use cue_editor::sync::{FileSynchronizer, TranscriptSync, UpdateResult};
use cue_editor::SyncDocument;
use proptest::prelude::*;

#[derive(Debug, Clone)]
struct Line {
    word: String,
    range: TimeRange,
    cut: bool,
}

/// Up to seven words with positive lengths and at least 1ms between
/// neighbours, starting past zero, each tagged with whether the test
/// should cut it.
fn lines() -> impl Strategy<Value = Vec<Line>> {
    prop::collection::vec(("[a-z]{1,6}", 1i64..200, 1i64..100, any::<bool>()), 1..8).prop_map(
        |raw| {
            let mut next = 0i64;
            raw.into_iter()
                .map(|(word, len, gap, cut)| {
                    let start = next + gap;
                    next = start + len;
                    Line {
                        word,
                        range: TimeRange::new(start, next - 1),
                        cut,
                    }
                })
                .collect()
        },
    )
}

fn render(lines: &[Line]) -> String {
    let mut text = String::new();
    for (i, line) in lines.iter().enumerate() {
        text.push_str(&format!(
            "{} [{}, {}] [{}]\n",
            line.word,
            line.range.start(),
            line.range.end(),
            i + 1
        ));
    }
    text
}

fn initialized(text: &str) -> (TranscriptSync, SyncDocument) {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut sync = TranscriptSync::new();
    let doc = SyncDocument::from_content(text);
    assert!(sync.initial_read(&doc));
    (sync, doc)
}

proptest! {
    /// Whatever subset of lines the user cuts, the commit leaves every
    /// survivor displaying exactly its timeline projection and every cut
    /// range dead.
    #[test]
    fn whole_line_deletions_always_reconcile(lines in lines()) {
        let text = render(&lines);
        let (mut sync, mut doc) = initialized(&text);
        let mut timeline = Timeline::new();

        // Back to front so earlier spans stay valid.
        let nodes = transcript::collect(&doc.text()).unwrap();
        for (node, line) in nodes.iter().zip(&lines).rev() {
            if line.cut {
                doc.delete(node.span.clone()).unwrap();
            }
        }
        let cut_any = lines.iter().any(|line| line.cut);
        let (result, _) = sync.obtain_changes(&mut doc, &mut timeline);
        let expected = if cut_any {
            UpdateResult::Updated
        } else {
            UpdateResult::NotUpdated
        };
        prop_assert_eq!(result, expected);

        for line in &lines {
            prop_assert_eq!(timeline.impose(line.range).is_valid(), !line.cut);
        }
        let survivors = transcript::collect(&doc.text()).unwrap();
        let kept: Vec<&Line> = lines.iter().filter(|line| !line.cut).collect();
        prop_assert_eq!(survivors.len(), kept.len());
        for (node, line) in survivors.iter().zip(&kept) {
            prop_assert_eq!(node.statement.word.as_str(), line.word.as_str());
            prop_assert_eq!(node.statement.range, timeline.impose(line.range));
        }
    }

    /// Cutting any one statement's span from the timeline and undeleting it
    /// again reproduces the original text byte for byte.
    #[test]
    fn cut_and_resurrect_round_trips_the_text(
        lines in lines(),
        pick in any::<prop::sample::Index>(),
    ) {
        let text = render(&lines);
        let (mut sync, mut doc) = initialized(&text);
        let mut timeline = Timeline::new();
        let target = lines[pick.index(lines.len())].range;

        timeline.delete(target);
        sync.on_timeline_changed(&mut doc, &mut timeline);
        let remaining = transcript::collect(&doc.text()).unwrap();
        prop_assert_eq!(remaining.len(), lines.len() - 1);

        timeline.add(target);
        sync.on_timeline_changed(&mut doc, &mut timeline);
        prop_assert_eq!(doc.text(), text);
    }

    /// Cutting the chosen lines all at once or one commit at a time lands on
    /// the same text and the same timeline.
    #[test]
    fn commit_granularity_does_not_matter(lines in lines()) {
        let text = render(&lines);

        let (mut sync_a, mut doc_a) = initialized(&text);
        let mut timeline_a = Timeline::new();
        let nodes = transcript::collect(&text).unwrap();
        for (node, line) in nodes.iter().zip(&lines).rev() {
            if line.cut {
                doc_a.delete(node.span.clone()).unwrap();
            }
        }
        sync_a.obtain_changes(&mut doc_a, &mut timeline_a);

        let (mut sync_b, mut doc_b) = initialized(&text);
        let mut timeline_b = Timeline::new();
        for (idx, line) in lines.iter().enumerate() {
            if !line.cut {
                continue;
            }
            let id = i32::try_from(idx).unwrap() + 1;
            let nodes = transcript::collect(&doc_b.text()).unwrap();
            let node = nodes.iter().find(|n| n.statement.id == id).unwrap();
            doc_b.delete(node.span.clone()).unwrap();
            let (result, _) = sync_b.obtain_changes(&mut doc_b, &mut timeline_b);
            prop_assert_eq!(result, UpdateResult::Updated);
        }

        prop_assert_eq!(doc_a.text(), doc_b.text());
        prop_assert_eq!(timeline_a.deleted_ranges(), timeline_b.deleted_ranges());
    }
}
