use rustyline::{Config, Editor, Result};

pub fn generate_prompt(is_open: bool) -> String {
    if is_open {
        "› ".to_string()
    } else {
        "(minimised) › ".to_string()
    }
}

pub fn rl() -> Result<Editor<()>> {
    let config = Config::builder()
        .history_ignore_space(true)
        .auto_add_history(false)
        .build();
    Editor::with_config(config)
}
