//! Command implementations for the CLI

use crate::{
    cli::Command,
    config::Config,
    core::{Interpreter, RunOptions, Session},
    device::Device,
    error::{CliError, SessionError},
    utils::{LineSource, OutputSink, ReaderSource, WriterSink},
};
use anyhow::Context;
use std::io::{self, BufReader};
use tracing::{info, instrument, warn};

/// Execute the appropriate command based on CLI arguments
#[instrument(skip(config))]
pub fn execute_command(config: &Config, command: &Command) -> anyhow::Result<()> {
    let device = Device::new(config.hostname.clone());
    let interpreter = build_interpreter(config, &device)?;

    match command {
        Command::Console => execute_console_command(&interpreter, &device),
        Command::Run { .. } => execute_run_command(config, &interpreter, &device),
        Command::Tree => execute_tree_command(&interpreter),
    }
}

/// Register the device command set and freeze it behind an interpreter
pub fn build_interpreter(config: &Config, device: &Device) -> anyhow::Result<Interpreter> {
    let tree = device
        .command_tree()
        .context("Failed to build the command tree")?;
    Ok(Interpreter::new(tree).with_comment_prefixes(config.comment_prefixes.clone()))
}

/// Run the interactive console
#[instrument(skip_all)]
fn execute_console_command(interpreter: &Interpreter, device: &Device) -> anyhow::Result<()> {
    info!("Starting interactive console");

    let stdin = io::stdin();
    let mut source = ReaderSource::new(stdin.lock());
    let mut sink = WriterSink::new(io::stdout());
    let mut session = interpreter.create_session();

    let result = console_loop(interpreter, device, &mut session, &mut source, &mut sink);
    interpreter.destroy_session(session);
    result
}

/// Read-eval-print loop; `exit` at the root ends the session
pub fn console_loop(
    interpreter: &Interpreter,
    device: &Device,
    session: &mut Session,
    source: &mut dyn LineSource,
    sink: &mut dyn OutputSink,
) -> anyhow::Result<()> {
    loop {
        sink.write(&session.prompt(&device.hostname()))
            .context("Failed to write prompt")?;

        let Some(line) = source.next_line().context("Failed to read input")? else {
            sink.write("\n").context("Failed to write output")?;
            break;
        };

        match interpreter.execute(&line, session, sink) {
            Ok(outcome) => {
                if !outcome.output.is_empty() && !outcome.output.ends_with('\n') {
                    sink.write("\n").context("Failed to write output")?;
                }
            }
            Err(CliError::Session(SessionError::CannotExitRoot)) => break,
            Err(err) if err.is_line_local() => {
                sink.write(&format!("{}\n", err.render(&line)))
                    .context("Failed to write diagnostic")?;
            }
            Err(err) => return Err(err).context("Console session aborted"),
        }
    }

    info!("Console session closed");
    Ok(())
}

/// Execute a script file
#[instrument(skip_all)]
fn execute_run_command(
    config: &Config,
    interpreter: &Interpreter,
    device: &Device,
) -> anyhow::Result<()> {
    let script = config
        .script
        .as_ref()
        .context("No script file configured")?;
    info!("Running script: {}", script.display());

    let file = std::fs::File::open(script)
        .with_context(|| format!("Failed to open script {}", script.display()))?;
    let mut source = ReaderSource::new(BufReader::new(file));
    let mut sink = WriterSink::new(io::stdout());
    let mut session = interpreter.create_session();

    let prompt: &dyn Fn(&Session) -> String = &|session| session.prompt(&device.hostname());
    let options = RunOptions {
        keep_going: config.keep_going,
        echo: config.echo.then_some(prompt),
    };

    let summary = interpreter
        .run(&mut source, &mut session, &mut sink, &options)
        .context("Script execution failed")?;
    interpreter.destroy_session(session);

    if summary.failed > 0 {
        warn!(
            "Script finished with {} failing line(s) out of {}",
            summary.failed,
            summary.executed + summary.failed
        );
        anyhow::bail!("{} line(s) failed", summary.failed);
    }

    info!("Script completed: {} line(s) executed", summary.executed);
    Ok(())
}

/// Print the registered command tree
#[instrument(skip_all)]
fn execute_tree_command(interpreter: &Interpreter) -> anyhow::Result<()> {
    let mut sink = WriterSink::new(io::stdout());
    sink.write(&interpreter.tree().render())
        .context("Failed to write command tree")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::ScriptSource;

    #[test]
    fn test_console_loop_prompts_and_exits() {
        let config = Config::default();
        let device = Device::new("R1");
        let interpreter = build_interpreter(&config, &device).unwrap();
        let mut session = interpreter.create_session();
        let mut source = ScriptSource::new(["conf t", "hostname lab", "end", "show bogus", "exit", "echo unreachable"]);
        let mut sink = String::new();

        console_loop(&interpreter, &device, &mut session, &mut source, &mut sink).unwrap();

        assert!(sink.starts_with("R1#R1(config)#lab(config)#lab#"));
        assert!(sink.contains("% Invalid input detected"));
        assert!(!sink.contains("unreachable"));
    }

    #[test]
    fn test_console_loop_ends_at_eof() {
        let config = Config::default();
        let device = Device::new("R1");
        let interpreter = build_interpreter(&config, &device).unwrap();
        let mut session = interpreter.create_session();
        let mut source = ScriptSource::new(["echo hi"]);
        let mut sink = String::new();

        console_loop(&interpreter, &device, &mut session, &mut source, &mut sink).unwrap();
        assert_eq!(sink, "R1#hi\nR1#\n");
    }
}
