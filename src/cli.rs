use std::{fmt::Write as _, path::PathBuf};

use anyhow::{anyhow, bail, Context as _, Result};
use clap::{Args, Parser, Subcommand};

use comments_boundary::{
    CommentQuery, Credentials, NewUser, Sort, SortDirection, SortField, DEFAULT_PER_PAGE,
};
use comments_core::{
    api::{ApiError, BearerAuth, CommentsApi},
    captcha::CaptchaEvent,
    file::{AttachedFile, MSG_READ_FAILED},
    form::CommentForm,
    session::Session,
    thread::{build_threads, CommentThread},
    validate::FIELD_TEXT,
};

use crate::{api::HttpApi, config::Config, storage::FileTokenStore};

#[derive(Debug, Parser)]
#[command(version, about = "Read and write comments from the command line")]
pub struct Cli {
    /// Configuration file (TOML).
    #[arg(long, short, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Base URL of the comments API.
    #[arg(long, value_name = "URL")]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List comments as threads.
    List(ListCommand),
    /// Post a comment or a reply.
    Post(PostCommand),
    /// Log in and keep the access token.
    Login(LoginCommand),
    /// Create a new account.
    Register(RegisterCommand),
    /// Forget the access token.
    Logout,
    /// Show the logged-in user.
    Whoami,
}

#[derive(Debug, Args)]
pub struct ListCommand {
    /// Page number (1-based).
    #[arg(long, default_value_t = 1)]
    pub page: u32,

    #[arg(long, default_value_t = DEFAULT_PER_PAGE)]
    pub per_page: u32,

    /// One of created_at, username or email.
    #[arg(long, default_value = "created_at")]
    pub sort_by: SortField,

    /// Either asc or desc.
    #[arg(long, default_value = "desc")]
    pub sort_dir: SortDirection,
}

#[derive(Debug, Args)]
pub struct PostCommand {
    #[arg(long)]
    pub text: String,

    /// ID of the comment to reply to.
    #[arg(long, value_name = "COMMENT_ID")]
    pub reply_to: Option<u64>,

    /// File to attach.
    #[arg(long, value_name = "PATH")]
    pub attach: Option<PathBuf>,

    /// Response token of a solved CAPTCHA challenge.
    #[arg(long, value_name = "TOKEN", env = "COMMENTS_CAPTCHA_TOKEN")]
    pub captcha: Option<String>,
}

#[derive(Debug, Args)]
pub struct LoginCommand {
    #[arg(long)]
    pub username: String,

    #[arg(long, env = "COMMENTS_PASSWORD", hide_env_values = true)]
    pub password: String,
}

#[derive(Debug, Args)]
pub struct RegisterCommand {
    #[arg(long)]
    pub username: String,

    #[arg(long)]
    pub email: String,

    #[arg(long, env = "COMMENTS_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// Defaults to the password.
    #[arg(long)]
    pub password_repeat: Option<String>,

    #[arg(long, value_name = "URL")]
    pub homepage: Option<String>,
}

type CliSession = Session<HttpApi, FileTokenStore>;

pub async fn run(args: Cli, mut cfg: Config) -> Result<()> {
    if let Some(url) = args.api_url {
        cfg.api.base_url = url;
    }
    log::debug!("Use comments API at {}", cfg.api.base_url);
    let api = HttpApi::new(cfg.api.base_url.clone(), BearerAuth::default());
    let session = Session::restore(api, FileTokenStore::new(&cfg.session.token_file));

    match args.command {
        Command::List(cmd) => list(&session, cmd).await,
        Command::Post(cmd) => post(&session, &cfg, cmd).await,
        Command::Login(cmd) => login(&session, cmd).await,
        Command::Register(cmd) => register(&session, cmd).await,
        Command::Logout => {
            session.logout();
            println!("Logged out");
            Ok(())
        }
        Command::Whoami => whoami(&session).await,
    }
}

async fn list(session: &CliSession, cmd: ListCommand) -> Result<()> {
    let ListCommand {
        page,
        per_page,
        sort_by,
        sort_dir,
    } = cmd;
    let query = CommentQuery {
        page: page.max(1),
        per_page,
        sort: Sort {
            field: sort_by,
            direction: sort_dir,
        },
    };
    let list = session.api().comments(&query).await.map_err(api_error)?;
    let has_next = list.has_next_page(per_page);
    let total = list.total();
    let threads = build_threads(list.into_comments());
    if threads.is_empty() {
        println!("No comments yet.");
    } else {
        print!("{}", render_threads(&threads));
    }
    match total {
        Some(total) => println!("Page {} ({total} comments)", query.page),
        None => println!("Page {}", query.page),
    }
    if has_next {
        println!("More comments on page {}", query.page + 1);
    }
    Ok(())
}

async fn post(session: &CliSession, cfg: &Config, cmd: PostCommand) -> Result<()> {
    let PostCommand {
        text,
        reply_to,
        attach,
        captcha,
    } = cmd;
    let mut form = CommentForm::new(reply_to).with_constraints(cfg.attachments.clone());
    form.set_text(text);

    if let Some(path) = attach {
        let bytes = tokio::fs::read(&path)
            .await
            .with_context(|| format!("{MSG_READ_FAILED}: {}", path.display()))?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "attachment".to_string());
        let mime = mime_guess::from_path(&path).first_or_octet_stream();
        form.attach(AttachedFile::new(name, mime.essence_str(), bytes))
            .map_err(|err| anyhow!("{err}"))?;
    }

    // solved out of band, only the response token is sent
    form.handle_captcha(CaptchaEvent::Rendered);
    if let Some(token) = captcha.filter(|t| !t.is_empty()) {
        form.handle_captcha(CaptchaEvent::Verified(token));
    }

    match form.submit(session.api()).await {
        Ok(created) => {
            println!("Comment {} created", created.comment_id);
            Ok(())
        }
        Err(err) => {
            for msg in form_errors(&form) {
                eprintln!("{msg}");
            }
            bail!("{err}")
        }
    }
}

async fn login(session: &CliSession, cmd: LoginCommand) -> Result<()> {
    let LoginCommand { username, password } = cmd;
    let user = session
        .login(&Credentials { username, password })
        .await
        .map_err(api_error)?;
    match user {
        Some(user) => println!("Logged in as {}", user.username),
        None => println!("Logged in"),
    }
    Ok(())
}

async fn register(session: &CliSession, cmd: RegisterCommand) -> Result<()> {
    let RegisterCommand {
        username,
        email,
        password,
        password_repeat,
        homepage,
    } = cmd;
    let new_user = NewUser {
        username,
        email,
        password_repeat: password_repeat.unwrap_or_else(|| password.clone()),
        password,
        homepage_url: homepage.filter(|url| !url.trim().is_empty()),
    };
    match session.register(&new_user).await {
        Ok(created) => {
            println!("User {} registered. You can log in now.", created.user_id);
            Ok(())
        }
        Err(ApiError::Validation(errors)) if !errors.is_empty() => {
            for (field, msg) in &errors {
                eprintln!("{field}: {msg}");
            }
            bail!("Registration failed")
        }
        Err(err) => Err(api_error(err)),
    }
}

async fn whoami(session: &CliSession) -> Result<()> {
    match session.fetch_user().await.map_err(api_error)? {
        Some(user) => {
            println!("{} <{}>", user.username, user.email);
            if let Some(url) = user.homepage_url {
                println!("{url}");
            }
        }
        None => println!("Not logged in"),
    }
    Ok(())
}

fn api_error(err: ApiError) -> anyhow::Error {
    anyhow!(err.user_message())
}

/// All feedback of a failed submission, text errors first.
fn form_errors(form: &CommentForm) -> Vec<String> {
    let other_fields = form
        .validation()
        .errors
        .iter()
        .filter(|(field, _)| field.as_str() != FIELD_TEXT)
        .map(|(field, msg)| format!("{field}: {msg}"));
    form.combined_errors()
        .into_iter()
        .chain(other_fields)
        .chain(form.file_error().map(ToString::to_string))
        .chain(form.captcha_error().map(ToString::to_string))
        .chain(form.general_error().map(ToString::to_string))
        .collect()
}

fn render_threads(threads: &[CommentThread]) -> String {
    fn render(out: &mut String, thread: &CommentThread, depth: usize) {
        let CommentThread { comment, replies } = thread;
        let indent = "  ".repeat(depth);
        let author = comment.username.as_deref().unwrap_or("Anonymous");
        let _ = write!(out, "{indent}#{} {author}", comment.id);
        if let Some(at) = &comment.created_at {
            let _ = write!(out, " ({at})");
        }
        out.push('\n');
        for line in comment.text.lines() {
            let _ = writeln!(out, "{indent}  {line}");
        }
        if let Some(url) = &comment.attachment {
            let _ = writeln!(out, "{indent}  [attachment] {url}");
        }
        for reply in replies {
            render(out, reply, depth + 1);
        }
    }
    let mut out = String::new();
    for thread in threads {
        render(&mut out, thread, 0);
    }
    out
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use comments_boundary::Comment;

    use super::*;

    #[test]
    fn parse_list_arguments() {
        let cli = Cli::try_parse_from([
            "comment-systems",
            "--api-url",
            "http://api",
            "list",
            "--page",
            "3",
            "--sort-by",
            "username",
            "--sort-dir",
            "asc",
        ])
        .unwrap();
        assert_eq!(cli.api_url.as_deref(), Some("http://api"));
        let Command::List(cmd) = cli.command else {
            panic!("unexpected command");
        };
        assert_eq!(cmd.page, 3);
        assert_eq!(cmd.per_page, DEFAULT_PER_PAGE);
        assert_eq!(cmd.sort_by, SortField::Username);
        assert_eq!(cmd.sort_dir, SortDirection::Asc);
    }

    #[test]
    fn reject_unknown_sort_field() {
        assert!(Cli::try_parse_from(["comment-systems", "list", "--sort-by", "id"]).is_err());
    }

    #[test]
    fn render_nested_threads() {
        let comments = vec![
            Comment {
                id: 1,
                text: "Hello".to_string(),
                username: Some("alice".to_string()),
                ..Comment::default()
            },
            Comment {
                id: 2,
                text: "Hi\nthere".to_string(),
                parent_comment: Some(1),
                attachment: Some("http://files/a.png".to_string()),
                ..Comment::default()
            },
        ];
        let rendered = render_threads(&build_threads(comments));
        assert_eq!(
            rendered,
            "#1 alice\n  Hello\n  #2 Anonymous\n    Hi\n    there\n    [attachment] http://files/a.png\n"
        );
    }

    #[test]
    fn collect_form_errors() {
        let mut form = CommentForm::new(None);
        form.handle_captcha(CaptchaEvent::Rendered);
        assert!(form.begin_submit().is_err());
        let errors = form_errors(&form);
        assert!(!errors.is_empty());
        assert_eq!(
            errors.last().map(String::as_str),
            Some(comments_core::submit::MSG_CAPTCHA_REQUIRED)
        );
    }
}
