use crate::types::{SlackBlock, SlackElement, SlackMessage, SlackText};
use keiho_core::Notification;

pub const DEFAULT_MAX_LOG_LINES: usize = 5;

/// Format a notification as a Block Kit message for `channel`.
///
/// Layout: a header with the title, a section with the description, a
/// section with the last `max_log_lines` log lines when there are any, and
/// one actions block with a URL button per link.
pub fn format_slack_message(
    notification: &Notification,
    channel: &str,
    max_log_lines: usize,
) -> SlackMessage {
    let mut blocks = vec![
        SlackBlock::Header {
            text: SlackText::plain_text(&notification.title),
        },
        SlackBlock::Section {
            text: SlackText::markdown(&notification.description),
            fields: None,
        },
    ];

    let logs = notification.tail_logs(max_log_lines);
    if !logs.is_empty() {
        blocks.push(SlackBlock::Section {
            text: SlackText::markdown(format!("Last Log Messages: ```{}```", logs.join("\n"))),
            fields: None,
        });
    }

    for (label, url) in &notification.links {
        let id = action_id(label);
        blocks.push(SlackBlock::Actions {
            block_id: id.clone(),
            elements: vec![SlackElement::Button {
                text: SlackText::label(label),
                action_id: id.clone(),
                url: url.to_string(),
                value: id,
            }],
        });
    }

    SlackMessage {
        channel: channel.to_string(),
        text: notification.title.clone(),
        blocks: Some(blocks),
    }
}

/// `Open In Dataflow` becomes `open_in_dataflow`
fn action_id(label: &str) -> String {
    label.replace(' ', "_").to_lowercase()
}
