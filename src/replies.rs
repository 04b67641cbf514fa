//! Reply texts and inline keyboards.
//!
//! Every reply renders with Telegram's HTML parse mode, so user-supplied
//! strings go through [`html_escape`] before they land in markup.

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use crate::catalog::OS_CATALOG;
use crate::installs::InstallRequest;

pub const BOT_NAME: &str = "Installer RDP";

/// Escape a string for safe inclusion in HTML-mode message text.
pub fn html_escape(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '&' => result.push_str("&amp;"),
            _ => result.push(c),
        }
    }
    result
}

/// Unix seconds rendered as `YYYY-MM-DD HH:MM:SS` (UTC).
pub fn format_timestamp(unix_secs: i64) -> String {
    match chrono::DateTime::from_timestamp(unix_secs, 0) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => unix_secs.to_string(),
    }
}

fn mention(user_id: i64, first_name: &str) -> String {
    format!(
        "<a href=\"tg://user?id={user_id}\">{}</a>",
        html_escape(first_name)
    )
}

/// The menu screens reachable from inline buttons. Each variant's callback
/// data string travels through Telegram and comes back in the callback query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    Main,
    OsList,
    Install,
    Account,
    Status,
    History,
}

impl MenuAction {
    pub fn as_callback_data(self) -> &'static str {
        match self {
            MenuAction::Main => "menu_main",
            MenuAction::OsList => "menu_oslist",
            MenuAction::Install => "menu_install",
            MenuAction::Account => "menu_account",
            MenuAction::Status => "menu_status",
            MenuAction::History => "menu_history",
        }
    }

    pub fn parse(data: &str) -> Option<Self> {
        match data {
            "menu_main" => Some(MenuAction::Main),
            "menu_oslist" => Some(MenuAction::OsList),
            "menu_install" => Some(MenuAction::Install),
            "menu_account" => Some(MenuAction::Account),
            "menu_status" => Some(MenuAction::Status),
            "menu_history" => Some(MenuAction::History),
            _ => None,
        }
    }
}

pub fn main_menu() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![
            InlineKeyboardButton::callback("🚀 Install OS", MenuAction::Install.as_callback_data()),
            InlineKeyboardButton::callback("💽 OS list", MenuAction::OsList.as_callback_data()),
        ],
        vec![
            InlineKeyboardButton::callback(
                "📊 Install status",
                MenuAction::Status.as_callback_data(),
            ),
            InlineKeyboardButton::callback("🧾 History", MenuAction::History.as_callback_data()),
        ],
        vec![InlineKeyboardButton::callback(
            "👤 Account / Login",
            MenuAction::Account.as_callback_data(),
        )],
    ])
}

/// The single back button every sub-screen carries.
pub fn back_menu() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
        "⬅️ Back",
        MenuAction::Main.as_callback_data(),
    )]])
}

pub fn start_text(user_id: i64, first_name: &str) -> String {
    format!(
        "🌟 <b>WELCOME TO {}</b> 🌟\n\n\
         Hi {}!\n\
         Ready to get a Windows RDP running on your VPS?\n\n\
         <b>MAIN COMMANDS</b>\n\
         <code>/login [username] [password]</code> - register or log in\n\
         <code>/oslist</code> - list the available OS images\n\
         <code>/install [ip] [port] [os_id]</code> - request an OS install on your VPS\n\
         <code>/status</code> - show your active installs\n\
         <code>/history</code> - show your install history\n\n\
         <i>{BOT_NAME} - requests go to a queue, a worker does the rest</i>",
        BOT_NAME.to_uppercase(),
        mention(user_id, first_name),
    )
}

pub fn help_text() -> String {
    format!(
        "📝 <b>{} BOT HELP</b>\n\n\
         <b>1. Log in / register</b>\n\
         <code>/login username password</code>\n\
         • No account yet: one is created for you.\n\
         • Existing account: the password is checked.\n\n\
         <b>2. List OS images</b>\n\
         <code>/oslist</code>\n\
         • Shows every image and the <code>os_id</code> to use with /install.\n\n\
         <b>3. Request an install</b>\n\
         <code>/install ip port os_id</code>\n\
         Example:\n\
         <code>/install 128.199.59.22 22 win-10-pro</code>\n\n\
         <b>4. Check status and history</b>\n\
         <code>/status</code>  - your active installs\n\
         <code>/history</code> - everything your account ever filed\n\n\
         ⚠️ <b>NOTE</b>: this bot never connects to the VPS itself.\n\
         Hook up your own installer by reading <code>installs.json</code>.",
        BOT_NAME.to_uppercase(),
    )
}

pub fn login_usage() -> String {
    "Usage: <code>/login username password</code>\n\
     Example: <code>/login alice superpass</code>"
        .to_string()
}

pub fn username_taken() -> String {
    "❌ That username is already taken by another user.".to_string()
}

pub fn login_ok(username: &str) -> String {
    format!(
        "✅ Login successful!\nUsername: <b>{}</b>",
        html_escape(username)
    )
}

pub fn wrong_password() -> String {
    "❌ Wrong password.".to_string()
}

pub fn registered(username: &str) -> String {
    format!(
        "✅ Registration successful!\nUsername: <b>{}</b>",
        html_escape(username)
    )
}

pub fn account_info(user_id: i64, username: &str) -> String {
    format!(
        "👤 <b>Account info</b>\n\n\
         Telegram id: <code>{user_id}</code>\n\
         Bot username: <b>{}</b>\n",
        html_escape(username),
    )
}

pub fn logged_out() -> String {
    "✅ You are logged out and your account data is deleted.".to_string()
}

pub fn not_logged_in() -> String {
    "You are not logged in.".to_string()
}

/// Gate text for commands that need an account.
pub fn not_registered() -> String {
    "❌ You are not registered / logged in.\n\
     Register or log in first with:\n\
     <code>/login username password</code>"
        .to_string()
}

/// Gate text for the status and history menu screens.
pub fn menu_login_required() -> String {
    "❌ You are not logged in.\n\
     Use: <code>/login username password</code>"
        .to_string()
}

/// Gate text for the account menu screen.
pub fn account_login_hint() -> String {
    "👤 You are not logged in.\n\n\
     Register or log in with:\n\
     <code>/login username password</code>"
        .to_string()
}

pub fn oslist_text() -> String {
    let mut lines = vec!["💽 <b>AVAILABLE OS IMAGES:</b>\n".to_string()];
    for os in OS_CATALOG {
        lines.push(format!(
            "<code>{}</code> - <b>{}</b>\n  <i>{}</i>\n",
            os.id, os.name, os.note
        ));
    }
    lines.join("\n")
}

pub fn install_usage() -> String {
    "Format: <code>/install ip port os_id</code>\n\
     Example: <code>/install 128.199.59.22 22 win-10-pro</code>"
        .to_string()
}

pub fn unknown_os() -> String {
    "❌ Unknown os_id.\n\
     Check the available images with: /oslist"
        .to_string()
}

pub fn install_created(install: &InstallRequest) -> String {
    format!(
        "✅ <b>Install request saved!</b>\n\n\
         Install id: <code>{}</code>\n\
         VPS: <code>{}:{}</code>\n\
         OS: <b>{}</b> (<code>{}</code>)\n\n\
         <i>Nothing has touched the VPS yet.</i>\n\
         A separate worker picks the request up from <code>installs.json</code>.",
        install.install_id,
        html_escape(&install.ip),
        install.port,
        install.os_name,
        install.os_id,
    )
}

pub fn no_active_installs() -> String {
    "No active or pending installs.".to_string()
}

/// `/status` body for a non-empty list of active requests.
pub fn status_text(installs: &[InstallRequest]) -> String {
    let mut lines = vec!["📊 <b>ACTIVE INSTALLS:</b>\n".to_string()];
    for install in installs {
        lines.push(format!(
            "• <code>{}</code> - <b>{}</b>\n  VPS: <code>{}:{}</code>\n  Status: <b>{}</b> (created {})\n",
            install.install_id,
            install.os_name,
            html_escape(&install.ip),
            install.port,
            install.status,
            format_timestamp(install.created_at),
        ));
    }
    lines.join("\n")
}

pub fn no_history() -> String {
    "No install history yet.".to_string()
}

/// `/history` body for a non-empty list. Unlike `/status` this one also
/// shows the os_id and final statuses.
pub fn history_text(installs: &[InstallRequest]) -> String {
    let mut lines = vec!["🧾 <b>YOUR INSTALL HISTORY:</b>\n".to_string()];
    for install in installs {
        lines.push(format!(
            "• <code>{}</code> - <b>{}</b> (<code>{}</code>)\n  VPS: <code>{}:{}</code>\n  Status: <b>{}</b> - {}\n",
            install.install_id,
            install.os_name,
            install.os_id,
            html_escape(&install.ip),
            install.port,
            install.status,
            format_timestamp(install.created_at),
        ));
    }
    lines.join("\n")
}

pub fn main_menu_title() -> String {
    format!("🏠 <b>{BOT_NAME} main menu</b>")
}

pub fn install_howto() -> String {
    "🚀 <b>INSTALL AN OS</b>\n\n\
     Send this command in chat:\n\n\
     <code>/install ip port os_id</code>\n\
     Example:\n\
     <code>/install 128.199.59.22 22 win-10-pro</code>"
        .to_string()
}
