use crossbeam::channel::{Receiver, Sender};
use kcnf_picker::{PickerError, PickerOptions};

use crate::pipeline::Selector;

const PREVIEW_SOURCE: &str = "{ echo '# {2}'; kubectl config view --kubeconfig {2}; }";
const BAT_PAGER: &str = "bat --style=plain --color=always --language=yaml";
const PLAIN_PAGER: &str = "cat";

/// Shell command rendering the kubeconfig of the focused line.
pub fn preview_command(bat_available: bool) -> String {
    let pager = if bat_available { BAT_PAGER } else { PLAIN_PAGER };
    format!("{PREVIEW_SOURCE} | {pager}")
}

/// Picker arguments for one run: show the label, keep the path as the second
/// field for the preview, start with the preview hidden.
pub fn picker_args(height: &str, query: &str, preview: &str) -> Vec<String> {
    vec![
        "--layout=reverse".to_string(),
        format!("--height={height}"),
        "--delimiter=\\t".to_string(),
        "--with-nth=1".to_string(),
        format!("--query={query}"),
        "--bind=tab:toggle-preview".to_string(),
        "--preview-window=hidden,wrap,75%".to_string(),
        format!("--preview={preview}"),
    ]
}

pub fn configure_picker(
    height: &str,
    query: &str,
    bat_available: bool,
) -> Result<PickerOptions, PickerError> {
    PickerOptions::parse(picker_args(height, query, &preview_command(bat_available)))
}

impl Selector for PickerOptions {
    fn select(&self, input: Receiver<String>, output: Sender<String>) -> Result<(), PickerError> {
        kcnf_picker::run(self, input, output)
    }
}
