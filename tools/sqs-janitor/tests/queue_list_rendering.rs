use sqs_janitor::controller::{ControllerOutcome, QueueListController, COUNT_HEADER, URL_HEADER};
use sqs_janitor::hotkeys::HotkeyAction;
use sqs_janitor::tui::{render_queue_list, render_queue_table_lines};
use sqs_janitor::types::{QueueDetails, QueueListModel};
use std::sync::mpsc;

const ORDERS: &str = "https://sqs.us-east-1.amazonaws.com/111122223333/orders";
const PAYMENTS: &str = "https://sqs.us-east-1.amazonaws.com/111122223333/payments-dlq";
const EMAILS: &str = "https://sqs.us-east-1.amazonaws.com/111122223333/emails";

fn fixed_model() -> QueueListModel {
    QueueListModel::new(vec![
        QueueDetails::new(ORDERS, 4821),
        QueueDetails::new(PAYMENTS, 77),
        QueueDetails::new(EMAILS, 0),
    ])
}

fn controller() -> (QueueListController, mpsc::Receiver<String>) {
    let (tx, rx) = mpsc::sync_channel(4);
    (QueueListController::new(fixed_model(), tx), rx)
}

fn line_with<'a>(frame: &'a str, needle: &str) -> &'a str {
    frame
        .lines()
        .find(|line| line.contains(needle))
        .unwrap_or_else(|| panic!("no line contains {needle}:\n{frame}"))
}

#[test]
fn table_lists_every_queue_once_with_its_count() {
    let (ctrl, _rx) = controller();
    let frame = render_queue_list(&ctrl, "ready", 120, 12).expect("render");

    assert!(frame.contains(COUNT_HEADER));
    assert!(frame.contains(URL_HEADER));
    for (url, count) in [(ORDERS, "4821"), (PAYMENTS, "77"), (EMAILS, "0")] {
        assert_eq!(frame.matches(url).count(), 1, "{url} should render once");
        assert!(line_with(&frame, url).contains(count), "{url} row lacks {count}");
    }
}

#[test]
fn rendering_is_deterministic_across_redraws() {
    let (ctrl, _rx) = controller();
    let first = render_queue_list(&ctrl, "ready", 120, 12).expect("first");
    let second = render_queue_list(&ctrl, "ready", 120, 12).expect("second");
    assert_eq!(first, second);
}

#[test]
fn highlight_marker_follows_the_cursor() {
    let (mut ctrl, _rx) = controller();
    let frame = render_queue_list(&ctrl, "", 120, 12).expect("render");
    assert!(line_with(&frame, ORDERS).contains("> "));
    assert!(!line_with(&frame, PAYMENTS).contains("> "));

    assert_eq!(
        ctrl.handle_input(HotkeyAction::CursorDown),
        Ok(ControllerOutcome::Moved)
    );
    let frame = render_queue_list(&ctrl, "", 120, 12).expect("render");
    assert!(line_with(&frame, PAYMENTS).contains("> "));
    assert!(!line_with(&frame, ORDERS).contains("> "));
}

#[test]
fn footer_shows_legend_and_status() {
    let (ctrl, _rx) = controller();
    let frame = render_queue_list(&ctrl, "purged emails", 120, 12).expect("render");
    assert!(frame.contains("enter purge"));
    assert!(frame.contains("purged emails"));
}

#[test]
fn empty_model_renders_headers_only() {
    let (tx, _rx) = mpsc::sync_channel(1);
    let ctrl = QueueListController::new(QueueListModel::default(), tx);
    let frame = render_queue_list(&ctrl, "", 80, 10).expect("render");
    assert!(frame.contains(URL_HEADER));
    assert!(frame.contains("Queues (0)"));
}

#[test]
fn enter_emits_selected_url_and_leaves_model_untouched() {
    let (mut ctrl, rx) = controller();
    ctrl.handle_input(HotkeyAction::CursorDown).expect("down");
    ctrl.handle_input(HotkeyAction::CursorDown).expect("down");

    assert_eq!(
        ctrl.handle_input(HotkeyAction::Purge),
        Ok(ControllerOutcome::PurgeRequested(EMAILS.to_string()))
    );
    assert_eq!(rx.try_recv().expect("request"), EMAILS);
    assert_eq!(ctrl.queues(), &fixed_model());
}

#[test]
fn moves_past_either_end_are_silently_ignored() {
    let (mut ctrl, rx) = controller();
    assert_eq!(
        ctrl.handle_input(HotkeyAction::CursorUp),
        Ok(ControllerOutcome::Ignored)
    );
    for _ in 0..5 {
        ctrl.handle_input(HotkeyAction::CursorDown).expect("down");
    }
    assert_eq!(ctrl.view().cursor_position(), 3);
    assert_eq!(ctrl.current_selection().map(|q| q.queue_url.as_str()), Some(EMAILS));
    assert!(rx.try_recv().is_err());
}

#[test]
fn plain_table_lines_align_counts_and_urls() {
    let lines = render_queue_table_lines(&fixed_model());
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], format!("{COUNT_HEADER}  {URL_HEADER}"));
    assert_eq!(lines[1], format!("{:<13}  {ORDERS}", 4821));
    assert!(lines[3].starts_with('0'));
    assert!(lines[3].ends_with(EMAILS));
}
