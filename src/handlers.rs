//! Command and menu callback routing.

use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::ParseMode;
use teloxide::utils::command::BotCommands;
use tracing::debug;

use crate::accounts::{Account, AccountStore, LoginOutcome};
use crate::config::Config;
use crate::installs::{InstallError, InstallStore};
use crate::replies::{self, MenuAction};

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Supported commands:")]
pub enum Command {
    #[command(description = "welcome message and main menu")]
    Start,
    #[command(description = "how to use the bot")]
    Help,
    #[command(description = "register or log in: /login username password")]
    Login(String),
    #[command(description = "your account info")]
    Me,
    #[command(description = "log out and delete your account")]
    Logout,
    #[command(description = "list the available OS images")]
    Oslist,
    #[command(description = "request an install: /install ip port os_id")]
    Install(String),
    #[command(description = "your active installs")]
    Status,
    #[command(description = "your install history")]
    History,
}

/// Shared handler state: the two stores behind the JSON files.
pub struct BotState {
    pub accounts: AccountStore,
    pub installs: InstallStore,
}

impl BotState {
    pub fn new(config: &Config) -> Self {
        Self {
            accounts: AccountStore::open(config.users_path()),
            installs: InstallStore::open(config.installs_path()),
        }
    }
}

/// Splits `/login` arguments into username and password. Everything after
/// the username counts as the password, so passwords may contain spaces
/// (runs of whitespace collapse to one).
fn parse_login_args(args: &str) -> Option<(String, String)> {
    let tokens: Vec<&str> = args.split_whitespace().collect();
    if tokens.len() < 2 {
        return None;
    }
    Some((tokens[0].to_string(), tokens[1..].join(" ")))
}

/// Splits `/install` arguments into ip, port and os_id. Extra trailing
/// tokens are ignored; a port that does not fit u16 is a usage error.
fn parse_install_args(args: &str) -> Option<(String, u16, String)> {
    let tokens: Vec<&str> = args.split_whitespace().collect();
    match tokens.as_slice() {
        [ip, port, os_id, ..] => {
            let port = port.parse::<u16>().ok()?;
            Some((ip.to_string(), port, os_id.to_string()))
        }
        _ => None,
    }
}

pub async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    state: Arc<BotState>,
) -> ResponseResult<()> {
    let user = match msg.from {
        Some(ref u) => u,
        None => return Ok(()),
    };
    let user_id = user.id.0 as i64;

    match cmd {
        Command::Start => {
            bot.send_message(msg.chat.id, replies::start_text(user_id, &user.first_name))
                .parse_mode(ParseMode::Html)
                .reply_markup(replies::main_menu())
                .await?;
        }
        Command::Help => {
            bot.send_message(msg.chat.id, replies::help_text())
                .parse_mode(ParseMode::Html)
                .await?;
        }
        Command::Login(args) => {
            let Some((username, password)) = parse_login_args(&args) else {
                bot.send_message(msg.chat.id, replies::login_usage())
                    .parse_mode(ParseMode::Html)
                    .await?;
                return Ok(());
            };
            let text = match state
                .accounts
                .register_or_authenticate(user_id, &username, &password)
                .await
            {
                LoginOutcome::Registered { username } => replies::registered(&username),
                LoginOutcome::LoggedIn { username } => replies::login_ok(&username),
                LoginOutcome::WrongPassword => replies::wrong_password(),
                LoginOutcome::UsernameTaken => replies::username_taken(),
            };
            bot.send_message(msg.chat.id, text)
                .parse_mode(ParseMode::Html)
                .await?;
        }
        Command::Me => {
            let Some(account) = require_account(&bot, &msg, user_id, &state).await? else {
                return Ok(());
            };
            bot.send_message(msg.chat.id, replies::account_info(user_id, &account.username))
                .parse_mode(ParseMode::Html)
                .await?;
        }
        Command::Logout => {
            if require_account(&bot, &msg, user_id, &state).await?.is_none() {
                return Ok(());
            }
            let text = if state.accounts.delete(user_id).await {
                replies::logged_out()
            } else {
                replies::not_logged_in()
            };
            bot.send_message(msg.chat.id, text).await?;
        }
        Command::Oslist => {
            bot.send_message(msg.chat.id, replies::oslist_text())
                .parse_mode(ParseMode::Html)
                .await?;
        }
        Command::Install(args) => {
            let Some(account) = require_account(&bot, &msg, user_id, &state).await? else {
                return Ok(());
            };
            let Some((ip, port, os_id)) = parse_install_args(&args) else {
                bot.send_message(msg.chat.id, replies::install_usage())
                    .parse_mode(ParseMode::Html)
                    .await?;
                return Ok(());
            };
            match state
                .installs
                .create(user_id, &account.username, &ip, port, &os_id)
                .await
            {
                Ok(request) => {
                    bot.send_message(msg.chat.id, replies::install_created(&request))
                        .parse_mode(ParseMode::Html)
                        .await?;
                }
                Err(InstallError::UnknownOs(_)) => {
                    bot.send_message(msg.chat.id, replies::unknown_os()).await?;
                }
            }
        }
        Command::Status => {
            if require_account(&bot, &msg, user_id, &state).await?.is_none() {
                return Ok(());
            }
            let active = state.installs.list_active(user_id).await;
            let text = if active.is_empty() {
                replies::no_active_installs()
            } else {
                replies::status_text(&active)
            };
            bot.send_message(msg.chat.id, text)
                .parse_mode(ParseMode::Html)
                .await?;
        }
        Command::History => {
            if require_account(&bot, &msg, user_id, &state).await?.is_none() {
                return Ok(());
            }
            let all = state.installs.list_all(user_id).await;
            let text = if all.is_empty() {
                replies::no_history()
            } else {
                replies::history_text(&all)
            };
            bot.send_message(msg.chat.id, text)
                .parse_mode(ParseMode::Html)
                .await?;
        }
    }

    Ok(())
}

/// Guard for commands that need an account. Sends the gate text and yields
/// `None` when the user has none.
async fn require_account(
    bot: &Bot,
    msg: &Message,
    user_id: i64,
    state: &BotState,
) -> ResponseResult<Option<Account>> {
    match state.accounts.get(user_id).await {
        Some(account) => Ok(Some(account)),
        None => {
            bot.send_message(msg.chat.id, replies::not_registered())
                .parse_mode(ParseMode::Html)
                .await?;
            Ok(None)
        }
    }
}

pub async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    state: Arc<BotState>,
) -> ResponseResult<()> {
    // Stop the client-side spinner whatever the data turns out to be.
    bot.answer_callback_query(q.id.clone()).await?;

    let Some(message) = q.regular_message() else {
        return Ok(());
    };
    let Some(data) = q.data.as_deref() else {
        return Ok(());
    };
    let Some(action) = MenuAction::parse(data) else {
        debug!("Ignoring unknown callback data: {data}");
        return Ok(());
    };

    let user_id = q.from.id.0 as i64;
    let chat_id = message.chat.id;
    let message_id = message.id;

    let (text, markup) = match action {
        MenuAction::Main => (replies::main_menu_title(), replies::main_menu()),
        MenuAction::OsList => (replies::oslist_text(), replies::back_menu()),
        MenuAction::Install => (replies::install_howto(), replies::back_menu()),
        MenuAction::Account => {
            let text = match state.accounts.get(user_id).await {
                Some(account) => replies::account_info(user_id, &account.username),
                None => replies::account_login_hint(),
            };
            (text, replies::back_menu())
        }
        MenuAction::Status => {
            let text = if state.accounts.get(user_id).await.is_none() {
                replies::menu_login_required()
            } else {
                let active = state.installs.list_active(user_id).await;
                if active.is_empty() {
                    replies::no_active_installs()
                } else {
                    replies::status_text(&active)
                }
            };
            (text, replies::back_menu())
        }
        MenuAction::History => {
            let text = if state.accounts.get(user_id).await.is_none() {
                replies::menu_login_required()
            } else {
                let all = state.installs.list_all(user_id).await;
                if all.is_empty() {
                    replies::no_history()
                } else {
                    replies::history_text(&all)
                }
            };
            (text, replies::back_menu())
        }
    };

    bot.edit_message_text(chat_id, message_id, text)
        .parse_mode(ParseMode::Html)
        .reply_markup(markup)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_login_args() {
        assert_eq!(
            parse_login_args("alice hunter2"),
            Some(("alice".to_string(), "hunter2".to_string()))
        );
        assert_eq!(parse_login_args("alice"), None);
        assert_eq!(parse_login_args(""), None);
        assert_eq!(parse_login_args("   "), None);
    }

    #[test]
    fn test_parse_login_args_password_keeps_spaces() {
        assert_eq!(
            parse_login_args("alice correct horse battery"),
            Some(("alice".to_string(), "correct horse battery".to_string()))
        );
        // Runs of whitespace collapse, same as the client splitting args.
        assert_eq!(
            parse_login_args("alice  a   b"),
            Some(("alice".to_string(), "a b".to_string()))
        );
    }

    #[test]
    fn test_parse_install_args() {
        assert_eq!(
            parse_install_args("10.0.0.5 3389 win-10-pro"),
            Some(("10.0.0.5".to_string(), 3389, "win-10-pro".to_string()))
        );
        assert_eq!(parse_install_args("10.0.0.5 3389"), None);
        assert_eq!(parse_install_args(""), None);
    }

    #[test]
    fn test_parse_install_args_ignores_extras() {
        assert_eq!(
            parse_install_args("10.0.0.5 22 win-11-pro trailing junk"),
            Some(("10.0.0.5".to_string(), 22, "win-11-pro".to_string()))
        );
    }

    #[test]
    fn test_parse_install_args_rejects_bad_ports() {
        assert_eq!(parse_install_args("10.0.0.5 rdp win-10-pro"), None);
        assert_eq!(parse_install_args("10.0.0.5 70000 win-10-pro"), None);
        assert_eq!(parse_install_args("10.0.0.5 -1 win-10-pro"), None);
    }
}
