pub mod install;

pub use install::{install_prompt_choice, render_install_prompt};
