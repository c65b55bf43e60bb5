mod args;
mod repl;

pub use args::CliArgs;
pub use repl::{
    BANNER, FAREWELL_LINE, InputAction, LineSource, PROMPT, READY_LINE, ReadOutcome,
    TerminalInput, classify_input, run_repl,
};
