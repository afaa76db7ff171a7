//! REPL (Read-Eval-Print Loop) for interactive chat

use rustyline::error::ReadlineError;
use rustyline::{DefaultEditor, Result as RlResult};
use safra_application::{ChatService, SessionOverride};
use std::sync::Arc;

/// Interactive chat REPL
pub struct ChatRepl {
    service: Arc<ChatService>,
    show_banner: bool,
}

impl ChatRepl {
    /// Create a new ChatRepl
    pub fn new(service: Arc<ChatService>) -> Self {
        Self {
            service,
            show_banner: true,
        }
    }

    /// Set whether to show the welcome banner
    pub fn with_banner(mut self, show: bool) -> Self {
        self.show_banner = show;
        self
    }

    /// Run the interactive REPL
    pub async fn run(&self) -> RlResult<()> {
        let mut rl = DefaultEditor::new()?;

        // Try to load history
        let history_path = dirs::data_dir().map(|p| p.join("safra").join("history.txt"));

        if let Some(ref path) = history_path {
            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            let _ = rl.load_history(path);
        }

        if self.show_banner {
            self.print_welcome();
        }

        loop {
            let readline = rl.readline(">>> ");

            match readline {
                Ok(line) => {
                    let line = line.trim();

                    // Skip empty lines
                    if line.is_empty() {
                        continue;
                    }

                    // Handle commands
                    if line.starts_with('/') {
                        if self.handle_command(line) {
                            break;
                        }
                        continue;
                    }

                    // Add to history
                    let _ = rl.add_history_entry(line);

                    let outcome = self
                        .service
                        .send(line, None, SessionOverride::Inherit)
                        .await;

                    // A one-shot exchange minted a session: follow it
                    if let Some(session_id) = outcome.redirect_to {
                        self.service.set_active_context(Some(session_id.clone()));
                        println!("(session {})", session_id);
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!("Bye!");
                    break;
                }
                Err(err) => {
                    eprintln!("Error: {:?}", err);
                    break;
                }
            }
        }

        // Save history
        if let Some(ref path) = history_path {
            let _ = rl.save_history(path);
        }

        Ok(())
    }

    fn print_welcome(&self) {
        println!();
        println!("╭─────────────────────────────────────────────╮");
        println!("│          Safra - CPR Assistant Chat         │");
        println!("╰─────────────────────────────────────────────╯");
        println!();
        match self.service.session_id() {
            Some(id) => println!("Resuming session {}", id),
            None => println!("New conversation (session created on first message)"),
        }
        println!();
        println!("Commands: /new  /session  /quit");
        println!();
    }

    /// Handle a slash command. Returns true when the REPL should exit.
    fn handle_command(&self, line: &str) -> bool {
        match line {
            "/quit" | "/exit" | "/q" => {
                println!("Bye!");
                true
            }
            "/new" => {
                self.service.reset_conversation();
                println!("Started a new conversation.");
                false
            }
            "/session" => {
                match self.service.session_id() {
                    Some(id) => {
                        let origin = if self.service.locally_created(&id) {
                            "created here"
                        } else {
                            "resumed"
                        };
                        println!("Session: {} ({})", id, origin);
                    }
                    None => println!("No session yet."),
                }
                false
            }
            _ => {
                println!("Unknown command: {}", line);
                println!("Commands: /new  /session  /quit");
                false
            }
        }
    }
}
