//! Terminal output with CI fallback
//!
//! Interactive terminals get `cliclack` styling and `indicatif` download
//! bars. CI and piped output fall back to plain prefixed lines.

mod context;
mod output;
mod progress;
mod prompts;

pub use context::UiContext;
pub use output::{
    intro, outro_success, remark, step_info, step_ok, step_ok_detail, step_warn_hint,
};
pub use progress::download_bar;
pub use prompts::confirm;
