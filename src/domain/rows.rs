use crate::domain::{CallForest, CallNode, DispatchId, NodeStorage, OutcomeCode};
use std::collections::HashSet;
use std::time::{Duration, SystemTime};

pub const UNKNOWN_FUNCTION: &str = "(?)";
pub const EXPIRED_STATUS: &str = "Expired";

/// Display classification of a cell, mapped to a theme color by the UI.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Tone {
    Pending,
    Retry,
    Error,
    Ok,
}

/// One rendered call, ready for table layout.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CallRow {
    pub id: DispatchId,
    pub prefix: String,
    pub function: String,
    pub function_tone: Tone,
    pub status: String,
    pub status_tone: Tone,
    pub attempts: u32,
    pub elapsed: Duration,
    /// Still waiting on a verdict; the UI draws a spinner next to these.
    pub pending: bool,
    pub done: bool,
}

impl CallRow {
    /// Prefix plus function name, as laid out in the function column.
    pub fn function_cell_text(&self) -> String {
        format!("{}{}", self.prefix, self.function)
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CallTree {
    pub root: DispatchId,
    pub rows: Vec<CallRow>,
}

/// Everything the Functions tab needs, detached from the store's lock.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CallTreeSnapshot {
    pub trees: Vec<CallTree>,
}

impl CallTreeSnapshot {
    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    pub fn row_count(&self) -> usize {
        self.trees.iter().map(|tree| tree.rows.len()).sum()
    }
}

pub fn snapshot<S: NodeStorage>(forest: &CallForest<S>, now: SystemTime) -> CallTreeSnapshot {
    let trees = forest
        .roots()
        .iter()
        .map(|root| CallTree {
            root: root.clone(),
            rows: build_tree_rows(forest, root, now),
        })
        .collect();
    CallTreeSnapshot { trees }
}

/// Depth-first, child-order rows for the subtree under `root`.
pub fn build_tree_rows<S: NodeStorage>(
    forest: &CallForest<S>,
    root: &DispatchId,
    now: SystemTime,
) -> Vec<CallRow> {
    let mut rows = Vec::new();
    let mut ancestors = HashSet::new();
    let mut is_last = Vec::new();
    push_rows(forest, root, now, &mut is_last, &mut ancestors, &mut rows);
    rows
}

fn push_rows<S: NodeStorage>(
    forest: &CallForest<S>,
    id: &DispatchId,
    now: SystemTime,
    is_last: &mut Vec<bool>,
    ancestors: &mut HashSet<DispatchId>,
    rows: &mut Vec<CallRow>,
) {
    // Ids are externally supplied, so a node may reappear on its own path.
    // Shared children still render under every parent.
    if !ancestors.insert(id.clone()) {
        return;
    }

    let empty = CallNode::default();
    let node = forest.node(id).unwrap_or(&empty);
    let mut row = derive_row(id, node, now);
    row.prefix = tree_prefix(is_last);
    rows.push(row);

    let children = node.children();
    for (index, child) in children.iter().enumerate() {
        is_last.push(index + 1 == children.len());
        push_rows(forest, child, now, is_last, ancestors, rows);
        is_last.pop();
    }
    ancestors.remove(id);
}

/// Connector glyphs for a node whose ancestors' "is last child" flags are
/// `is_last`, outermost first. Roots get an empty prefix.
pub fn tree_prefix(is_last: &[bool]) -> String {
    let mut prefix = String::new();
    for (level, last) in is_last.iter().enumerate() {
        let glyph = if level + 1 == is_last.len() {
            if *last { "└─" } else { "├─" }
        } else if *last {
            "  "
        } else {
            "│ "
        };
        prefix.push_str(glyph);
        prefix.push(' ');
    }
    prefix
}

/// Derives the displayed state of a node at `now`. The tree prefix is left
/// empty; see [`tree_prefix`].
pub fn derive_row(id: &DispatchId, node: &CallNode, now: SystemTime) -> CallRow {
    let mut running = node.running;
    let mut done = node.done;
    let mut done_time = node.done_time;
    let mut error = node.last_error.clone();
    let mut pending = false;

    let succeeded = node.outcome.is_some_and(OutcomeCode::is_success);
    let tone = if node.done {
        if succeeded { Tone::Ok } else { Tone::Error }
    } else if let Some(expired_at) = node.expiration_time.filter(|deadline| *deadline < now) {
        error = Some(EXPIRED_STATUS.to_string());
        running = false;
        done = true;
        done_time = Some(expired_at);
        Tone::Error
    } else {
        pending = true;
        if node.failures > 0 {
            Tone::Retry
        } else {
            Tone::Pending
        }
    };

    let (status, status_tone) = if running {
        ("Running".to_string(), Tone::Pending)
    } else if let Some(error) = error {
        (error, tone)
    } else if let Some(code) = node.outcome.filter(|code| *code != OutcomeCode::Unspecified) {
        (code.label(), tone)
    } else if pending && node.responses > 0 {
        ("Suspended".to_string(), Tone::Pending)
    } else {
        ("Pending".to_string(), tone)
    };

    let function = if node.function.is_empty() {
        UNKNOWN_FUNCTION.to_string()
    } else {
        node.function.clone()
    };

    CallRow {
        id: id.clone(),
        prefix: String::new(),
        function,
        function_tone: tone,
        status,
        status_tone,
        attempts: attempts(node.failures, node.responses, running, done && succeeded),
        elapsed: elapsed(node.creation_time, done_time, done, now),
        pending,
        done,
    }
}

/// Every observed call has made at least one attempt.
pub fn attempts(failures: u32, responses: u32, running: bool, succeeded: bool) -> u32 {
    let extra = if running || succeeded || responses > failures {
        1
    } else {
        0
    };
    (failures + extra).max(1)
}

/// Time from creation to completion (or to `now` while open), truncated to
/// milliseconds. Zero when the creation time is unknown.
pub fn elapsed(
    creation_time: Option<SystemTime>,
    done_time: Option<SystemTime>,
    done: bool,
    now: SystemTime,
) -> Duration {
    let Some(created) = creation_time else {
        return Duration::ZERO;
    };
    let end = if done { done_time.unwrap_or(now) } else { now };
    let span = end.duration_since(created).unwrap_or(Duration::ZERO);
    Duration::from_millis(span.as_millis() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Outcome, RequestEvent, ResponseEvent};

    fn t(millis: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_millis(1_700_000_000_000 + millis)
    }

    fn id(value: &str) -> DispatchId {
        DispatchId::from(value)
    }

    fn only_row(forest: &CallForest, now: SystemTime) -> CallRow {
        let snapshot = snapshot(forest, now);
        assert_eq!(snapshot.trees.len(), 1);
        assert_eq!(snapshot.trees[0].rows.len(), 1);
        snapshot.trees[0].rows[0].clone()
    }

    #[test]
    fn prefixes_follow_ancestor_last_flags() {
        assert_eq!(tree_prefix(&[]), "");
        assert_eq!(tree_prefix(&[false]), "├─ ");
        assert_eq!(tree_prefix(&[true]), "└─ ");
        assert_eq!(tree_prefix(&[false, true]), "│  └─ ");
        assert_eq!(tree_prefix(&[true, false]), "   ├─ ");
        assert_eq!(tree_prefix(&[false, false, true]), "│  │  └─ ");
    }

    #[test]
    fn attempts_never_drop_below_one() {
        assert_eq!(attempts(0, 0, false, false), 1);
        assert_eq!(attempts(0, 0, true, false), 1);
        assert_eq!(attempts(2, 2, false, false), 2);
        assert_eq!(attempts(2, 2, true, false), 3);
        assert_eq!(attempts(1, 2, false, true), 2);
        assert_eq!(attempts(0, 1, false, false), 1);
    }

    #[test]
    fn elapsed_is_zero_without_creation_and_truncated_to_millis() {
        assert_eq!(elapsed(None, None, false, t(10)), Duration::ZERO);

        let created = t(0);
        let now = t(1_234) + Duration::from_micros(999);
        assert_eq!(
            elapsed(Some(created), None, false, now),
            Duration::from_millis(1_234)
        );
        assert_eq!(
            elapsed(Some(created), Some(t(500)), true, now),
            Duration::from_millis(500)
        );
    }

    #[test]
    fn freshly_requested_call_is_running_with_one_attempt() {
        let mut forest: CallForest = CallForest::new();
        forest
            .observe_request(&RequestEvent::root("A", "f").with_creation_time(t(0)), t(0))
            .expect("request");

        let row = only_row(&forest, t(2_000));
        assert_eq!(row.function, "f");
        assert_eq!(row.status, "Running");
        assert_eq!(row.status_tone, Tone::Pending);
        assert_eq!(row.function_tone, Tone::Pending);
        assert_eq!(row.attempts, 1);
        assert_eq!(row.elapsed, Duration::from_millis(2_000));
        assert!(row.pending);
    }

    #[test]
    fn placeholder_without_responses_is_pending_with_one_attempt() {
        let row = derive_row(&id("x"), &CallNode::fresh("f"), t(0));
        assert_eq!(row.status, "Pending");
        assert_eq!(row.attempts, 1);
        assert_eq!(row.elapsed, Duration::ZERO);
        assert!(row.pending);
    }

    #[test]
    fn success_freezes_elapsed_at_response() {
        let mut forest: CallForest = CallForest::new();
        forest
            .observe_request(&RequestEvent::root("A", "f").with_creation_time(t(0)), t(0))
            .expect("request");
        let _ = forest.observe_response(&ResponseEvent::outcome("A", Outcome::exit(OutcomeCode::Ok)), t(750));

        let row = only_row(&forest, t(60_000));
        assert_eq!(row.status, "OK");
        assert_eq!(row.function_tone, Tone::Ok);
        assert_eq!(row.status_tone, Tone::Ok);
        assert!(row.done);
        assert!(!row.pending);
        assert_eq!(row.attempts, 1);
        assert_eq!(row.elapsed, Duration::from_millis(750));
    }

    #[test]
    fn timeout_then_success_counts_two_attempts() {
        let mut forest: CallForest = CallForest::new();
        forest
            .observe_request(&RequestEvent::root("A", "f").with_creation_time(t(0)), t(0))
            .expect("request");
        let _ = forest.observe_response(
            &ResponseEvent::outcome("A", Outcome::exit(OutcomeCode::Timeout)),
            t(100),
        );

        let row = only_row(&forest, t(200));
        assert_eq!(row.status, "Timeout");
        assert_eq!(row.function_tone, Tone::Retry);
        assert_eq!(row.attempts, 1);
        assert!(!row.done);

        forest
            .observe_request(&RequestEvent::root("A", "f"), t(300))
            .expect("retry");
        let _ = forest.observe_response(&ResponseEvent::outcome("A", Outcome::exit(OutcomeCode::Ok)), t(400));

        let row = only_row(&forest, t(500));
        assert!(row.done);
        assert_eq!(row.status, "OK");
        assert_eq!(row.attempts, 2);
        assert_eq!(row.elapsed, Duration::from_millis(400));
    }

    #[test]
    fn poll_shows_suspended() {
        let mut forest: CallForest = CallForest::new();
        forest
            .observe_request(&RequestEvent::root("A", "f"), t(0))
            .expect("request");
        let _ = forest.observe_response(&ResponseEvent::outcome("A", Outcome::poll(OutcomeCode::Ok)), t(10));

        let row = only_row(&forest, t(20));
        assert_eq!(row.status, "Suspended");
        assert_eq!(row.status_tone, Tone::Pending);
        assert_eq!(row.attempts, 1);
        assert!(row.pending);
    }

    #[test]
    fn past_deadline_renders_expired() {
        let mut forest: CallForest = CallForest::new();
        forest
            .observe_request(
                &RequestEvent::root("A", "f")
                    .with_creation_time(t(0))
                    .with_expiration_time(t(5_000)),
                t(0),
            )
            .expect("request");

        let before = only_row(&forest, t(4_000));
        assert_eq!(before.status, "Running");

        let row = only_row(&forest, t(9_000));
        assert_eq!(row.status, EXPIRED_STATUS);
        assert_eq!(row.function_tone, Tone::Error);
        assert!(row.done);
        assert!(!row.pending);
        assert_eq!(row.attempts, 1);
        assert_eq!(row.elapsed, Duration::from_millis(5_000));

        // Display-only inference: the stored node is untouched.
        let node = forest.node(&id("A")).expect("node");
        assert!(!node.done);
        assert!(node.last_error.is_none());
    }

    #[test]
    fn stale_state_reset_renders_clean_counters() {
        let mut forest: CallForest = CallForest::new();
        forest
            .observe_request(&RequestEvent::root("X", "work"), t(0))
            .expect("request");
        let _ = forest.observe_response(&ResponseEvent::failed("X", "boom"), t(1));
        let _ = forest.observe_response(
            &ResponseEvent::outcome("X", Outcome::exit(OutcomeCode::IncompatibleState)),
            t(2),
        );

        let row = only_row(&forest, t(3));
        assert_eq!(row.function, "work");
        assert_eq!(row.attempts, 1);
        assert_eq!(row.status, "Incompatible state");
        assert_eq!(row.function_tone, Tone::Pending);
        assert!(!row.done);
    }

    #[test]
    fn tail_call_renders_new_function_fresh() {
        let mut forest: CallForest = CallForest::new();
        forest
            .observe_request(&RequestEvent::root("X", "f"), t(0))
            .expect("request");
        let _ = forest.observe_response(&ResponseEvent::http_status("X", 503), t(1));
        let _ = forest.observe_response(
            &ResponseEvent::outcome("X", Outcome::tail_call(OutcomeCode::Ok, "g")),
            t(2),
        );

        let row = only_row(&forest, t(3));
        assert_eq!(row.function, "g");
        assert!(!row.done);
        assert_eq!(row.status, "Pending");
        assert_eq!(row.attempts, 1);
        assert_eq!(row.elapsed, Duration::ZERO);
    }

    #[test]
    fn unknown_function_uses_placeholder() {
        let row = derive_row(&id("x"), &CallNode::default(), t(0));
        assert_eq!(row.function, UNKNOWN_FUNCTION);
    }

    #[test]
    fn walks_children_depth_first_with_prefixes() {
        let mut forest: CallForest = CallForest::new();
        forest
            .observe_request(&RequestEvent::root("r", "main"), t(0))
            .expect("root");
        forest
            .observe_request(&RequestEvent::child("r", "r", "a", "first"), t(0))
            .expect("a");
        forest
            .observe_request(&RequestEvent::child("r", "a", "a1", "nested"), t(0))
            .expect("a1");
        forest
            .observe_request(&RequestEvent::child("r", "r", "b", "second"), t(0))
            .expect("b");

        let rows = build_tree_rows(&forest, &id("r"), t(1));
        let cells: Vec<String> = rows.iter().map(CallRow::function_cell_text).collect();
        assert_eq!(
            cells,
            vec![
                "main".to_string(),
                "├─ first".to_string(),
                "│  └─ nested".to_string(),
                "└─ second".to_string(),
            ]
        );
    }

    #[test]
    fn unspecified_exit_code_shows_no_outcome_text() {
        let mut forest: CallForest = CallForest::new();
        forest
            .observe_request(&RequestEvent::root("A", "f"), t(0))
            .expect("request");
        let _ = forest.observe_response(
            &ResponseEvent::outcome("A", Outcome::exit(OutcomeCode::Unspecified)),
            t(10),
        );

        let row = only_row(&forest, t(20));
        assert_eq!(row.status, "Pending");
        assert!(row.done);
    }

    #[test]
    fn shared_child_renders_under_each_parent() {
        let mut forest: CallForest = CallForest::new();
        forest
            .observe_request(&RequestEvent::root("r", "main"), t(0))
            .expect("root");
        forest
            .observe_request(&RequestEvent::child("r", "r", "a", "left"), t(0))
            .expect("a");
        forest
            .observe_request(&RequestEvent::child("r", "r", "b", "right"), t(0))
            .expect("b");
        forest
            .observe_request(&RequestEvent::child("r", "a", "x", "shared"), t(0))
            .expect("x under a");
        forest
            .observe_request(&RequestEvent::child("r", "b", "x", "shared"), t(0))
            .expect("x under b");

        let rows = build_tree_rows(&forest, &id("r"), t(1));
        let cells: Vec<String> = rows.iter().map(CallRow::function_cell_text).collect();
        assert_eq!(
            cells,
            vec![
                "main".to_string(),
                "├─ left".to_string(),
                "│  └─ shared".to_string(),
                "└─ right".to_string(),
                "   └─ shared".to_string(),
            ]
        );
    }

    #[test]
    fn cycle_back_to_root_terminates() {
        let mut forest: CallForest = CallForest::new();
        forest
            .observe_request(&RequestEvent::root("r", "main"), t(0))
            .expect("root");
        forest
            .observe_request(&RequestEvent::child("r", "r", "a", "inner"), t(0))
            .expect("a");
        forest
            .observe_request(&RequestEvent::child("r", "a", "r", "main"), t(0))
            .expect("r under a");

        let rows = build_tree_rows(&forest, &id("r"), t(1));
        let cells: Vec<String> = rows.iter().map(CallRow::function_cell_text).collect();
        assert_eq!(cells, vec!["main".to_string(), "└─ inner".to_string()]);
    }

    #[test]
    fn roots_render_in_registration_order() {
        let mut forest: CallForest = CallForest::new();
        for root in ["z", "a", "m"] {
            forest
                .observe_request(&RequestEvent::root(root, "f"), t(0))
                .expect("root");
        }
        let snapshot = snapshot(&forest, t(1));
        let roots: Vec<&str> = snapshot.trees.iter().map(|tree| tree.root.as_str()).collect();
        assert_eq!(roots, vec!["z", "a", "m"]);
        assert_eq!(snapshot.row_count(), 3);
    }
}
