//! Fixed participant-facing texts.

use reading_kernel::{Key, KeyMapping};

/// Name of a key as shown on screen.
fn label(key: Key) -> String {
    key.name().to_uppercase()
}

pub fn language_prompt(first: Key, second: Key) -> String {
    format!(
        "Do you speak English as your FIRST language (L1) or SECOND language (L2)?\nPress '{}' for L1\nPress '{}' for L2",
        first, second
    )
}

pub fn welcome(continue_key: Key, break_every: usize) -> String {
    format!(
        "Welcome to the experiment!\n\n\
         In this study, you will read short descriptions followed by phrases. \
         Your task is to decide whether each phrase is meaningful or meaningless in the given context.\n\n\
         It is important to respond as quickly and accurately as possible.\n\n\
         There will be self-paced breaks every {} trials throughout the experiment, \
         so please use as much time as you need to rest so that you can maintain focus.\n\n\
         Press {} to continue.",
        break_every,
        label(continue_key)
    )
}

pub fn procedure(continue_key: Key, window_secs: f64) -> String {
    format!(
        "Here's how the experiment will proceed:\n\n\
         1. You will first read a short context sentence or two sentences on the screen. Then, press {key} to proceed.\n\n\
         2. A fixation cross (+) will appear to help you focus on the screen.\n\n\
         3. Next, the target phrase will be shown word by word.\n\n\
         4. Once the entire phrase is presented, you will have up to {secs} seconds to decide whether the phrase is meaningful or meaningless to you.\n\n\
         Press {key} to continue.",
        key = label(continue_key),
        secs = window_secs
    )
}

pub fn risks(continue_key: Key) -> String {
    format!(
        "Some phrases may seem unusual or difficult to understand.\n\n\
         If you feel uncomfortable or tired, you may withdraw at any time.\n\n\
         Press {} to continue.",
        label(continue_key)
    )
}

pub fn key_assignment(mapping: &KeyMapping, continue_key: Key) -> String {
    format!(
        "Key Assignment:\n\n'{}' = {}\n'{}' = {}\n\nPress {} to continue.",
        label(mapping.first),
        mapping.first_label.as_str().to_uppercase(),
        label(mapping.second),
        mapping.first_label.opposite().as_str().to_uppercase(),
        label(continue_key)
    )
}

pub fn practice_intro(continue_key: Key) -> String {
    format!("Let's begin with practice trials.\nPress {} to continue.", label(continue_key))
}

pub fn practice_complete(continue_key: Key) -> String {
    format!(
        "Practice complete.\nPress {} to start the main experiment.",
        label(continue_key)
    )
}

pub fn goodbye(exit_key: Key) -> String {
    format!(
        "Thank you for your participation! Please, notify the researcher about the completion of the experiment.\nPress {} to exit.",
        label(exit_key)
    )
}
