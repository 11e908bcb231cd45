// File: relaybot-core/src/services/message_sender.rs
//
// Helpers shared by reply senders: size-limit splitting per platform.

use relaybot_common::models::Platform;

/// Splits `text` into chunks of at most `max_len` bytes, breaking on whitespace.
///
/// Text that already fits is only trimmed. Otherwise runs of whitespace
/// collapse to a single space. A single word longer than
/// `max_len` is cut on a char boundary. Empty or all-whitespace input yields no chunks.
pub fn split_message(text: &str, max_len: usize) -> Vec<String> {
    let max_len = max_len.max(1);
    if text.len() <= max_len && !text.trim().is_empty() {
        return vec![text.trim().to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let added_len = if current.is_empty() { word.len() } else { word.len() + 1 };

        if current.len() + added_len > max_len && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
        }

        if word.len() > max_len {
            let mut rest = word;
            while rest.len() > max_len {
                let mut cut = max_len;
                while !rest.is_char_boundary(cut) {
                    cut -= 1;
                }
                if cut == 0 {
                    // A single char wider than the limit; send it whole.
                    cut = rest.chars().next().map(char::len_utf8).unwrap_or(rest.len());
                }
                chunks.push(rest[..cut].to_string());
                rest = &rest[cut..];
            }
            current.push_str(rest);
            continue;
        }

        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

/// [`split_message`] with the platform's own message limit.
pub fn split_for_platform(text: &str, platform: Platform) -> Vec<String> {
    split_message(text, platform.max_message_len())
}
