//! Event routing: classification, command handling, and research
//! orchestration.
//!
//! Every handler holds the per-user session guard across its
//! read-modify-write sequences, so two events for the same user are applied
//! in order while distinct users proceed independently.

use std::sync::Arc;

use tracing::{info, warn};

use {
    tansa_line::{
        compose,
        event::{
            ConfigOption, Event, MediaKind, MessageContent, Postback, PostbackAction,
            PostbackError,
        },
    },
    tansa_research::{ResearchTask, SubmitError, TaskStatus, engine::ResearchOptions},
    tansa_sessions::{ReportFormat, Session, SessionState},
};

use crate::state::GatewayState;

const WELCOME: &str = "Welcome to the research assistant!\n\n\
    I can dig into a topic for you:\n\
    - send a question to start a research query\n\
    - upload a file to add it to the knowledge base\n\
    - receive a detailed research report\n\n\
    Use /help to see all commands.";

const HELP: &str = "Research assistant\n\n\
    Send any question to start a research query, or upload a file for\n\
    analysis. Commands:\n\
    /help - show this message\n\
    /config - show your current configuration\n\
    /reset - reset your session\n\
    /status - show your current research state";

const ACK_RESEARCH: &str = "Working on your research query. This may take a while...";
const ACK_CONTENT: &str = "Processing your file. This may take a while...";
const RESEARCH_BUSY: &str =
    "A research task is already in progress. Cancel it first or wait for it to finish.";
const RESEARCH_FAILED: &str =
    "Something went wrong while processing your query. Please try again later.";
const CONTENT_OK: &str = "File processed. You can now ask questions about its contents.";
const CONTENT_FAILED: &str =
    "File processing failed. Check the format and size limit and try again.";
const UNSUPPORTED_MESSAGE: &str = "Sorry, I cannot handle this kind of message.";
const RESET_DONE: &str = "Your session has been reset.";
const CANCELLED: &str = "Research cancelled.";
const CANCEL_FAILED: &str = "Nothing to cancel - the research may already have finished.";
const POSTBACK_ERROR: &str =
    "Something went wrong while processing your request. Please try again later.";

/// Route one decoded event. An `Err` is contained to this event: the
/// webhook loop logs it and moves on to the next one.
pub async fn route_event(state: &Arc<GatewayState>, event: Event) -> anyhow::Result<()> {
    match event {
        Event::Message {
            reply_token,
            source,
            message,
        } => {
            let (Some(user_id), Some(reply_token)) = (source.user_id, reply_token) else {
                warn!("message event without user id or reply token");
                return Ok(());
            };
            match message {
                MessageContent::Text { text } => {
                    handle_text(state, &user_id, &reply_token, &text).await
                },
                other => match other.media() {
                    Some((message_id, kind)) => {
                        handle_media(state, &user_id, &reply_token, message_id, kind).await
                    },
                    None => {
                        state.messenger.reply(&reply_token, UNSUPPORTED_MESSAGE).await?;
                        Ok(())
                    },
                },
            }
        },
        Event::Postback {
            reply_token,
            source,
            postback,
        } => {
            let (Some(user_id), Some(reply_token)) = (source.user_id, reply_token) else {
                warn!("postback event without user id or reply token");
                return Ok(());
            };
            handle_postback(state, &user_id, &reply_token, postback).await
        },
        Event::Follow {
            reply_token,
            source,
        } => {
            let (Some(user_id), Some(reply_token)) = (source.user_id, reply_token) else {
                warn!("follow event without user id or reply token");
                return Ok(());
            };
            info!(user_id, "user followed");
            state.sessions.get(&user_id); // creates the session lazily
            state.messenger.reply(&reply_token, WELCOME).await?;
            Ok(())
        },
        Event::Unfollow { source } => {
            let Some(user_id) = source.user_id else {
                warn!("unfollow event without user id");
                return Ok(());
            };
            let removed = state.sessions.remove(&user_id);
            info!(user_id, removed, "user unfollowed, session deleted");
            Ok(())
        },
        Event::Unknown => {
            info!("ignoring unhandled event kind");
            Ok(())
        },
    }
}

async fn handle_text(
    state: &Arc<GatewayState>,
    user_id: &str,
    reply_token: &str,
    text: &str,
) -> anyhow::Result<()> {
    if let Some(command) = text.strip_prefix('/') {
        return handle_command(state, user_id, reply_token, command).await;
    }
    submit_research(state, user_id, reply_token, text).await
}

async fn handle_command(
    state: &Arc<GatewayState>,
    user_id: &str,
    reply_token: &str,
    command_text: &str,
) -> anyhow::Result<()> {
    let command = command_text
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();

    match command.as_str() {
        "help" => state.messenger.reply(reply_token, HELP).await?,
        "config" => {
            let session = state.sessions.get(user_id);
            state
                .messenger
                .reply(reply_token, &render_config(&session))
                .await?;
        },
        "reset" => {
            let _guard = state.sessions.guard(user_id).await;
            state.sessions.clear(user_id);
            state.messenger.reply(reply_token, RESET_DONE).await?;
        },
        "status" => {
            let session = state.sessions.get(user_id);
            let task = state.tasks.status(user_id);
            state
                .messenger
                .reply(reply_token, &render_status(&session, task.as_ref()))
                .await?;
        },
        other => {
            state
                .messenger
                .reply(
                    reply_token,
                    &format!("Unknown command: /{other}\nUse /help to see what I can do."),
                )
                .await?;
        },
    }
    Ok(())
}

fn render_config(session: &Session) -> String {
    let config = &session.config;
    format!(
        "Current configuration:\n\n\
         max search queries: {}\n\
         web search: {}\n\
         report format: {}\n\
         language: {}\n\
         notifications: {}",
        config.max_search_queries,
        if config.enable_web_search { "on" } else { "off" },
        config.report_format.as_str(),
        config.language,
        if config.notifications_enabled {
            "on"
        } else {
            "off"
        },
    )
}

fn render_status(session: &Session, task: Option<&ResearchTask>) -> String {
    let mut text = format!("Current state: {}", session.state.as_str());
    if session.state == SessionState::Researching {
        match task.filter(|t| t.status == TaskStatus::Processing) {
            Some(task) => {
                let elapsed = task.started_at.elapsed().as_secs();
                text.push_str(&format!(
                    "\nResearching \"{}\" for {elapsed}s...",
                    task.query
                ));
            },
            None => text.push_str("\nProcessing your research query..."),
        }
    }
    text
}

/// Move the session to `researching`, acknowledge, then run the engine as
/// an independent task so neither this event nor its batch waits on it.
async fn submit_research(
    state: &Arc<GatewayState>,
    user_id: &str,
    reply_token: &str,
    query: &str,
) -> anyhow::Result<()> {
    let options = {
        let _guard = state.sessions.guard(user_id).await;

        if let Err(SubmitError::AlreadyActive) = state.tasks.begin(user_id, query) {
            state.messenger.reply(reply_token, RESEARCH_BUSY).await?;
            return Ok(());
        }

        let mut session = state.sessions.get(user_id);
        session.state = SessionState::Researching;
        session.current_context = query.to_string();
        session.record_query(query);
        let options = ResearchOptions::from(&session.config);
        state.sessions.update(user_id, session);
        options
    };

    // The task is already underway; a lost acknowledgment must not stop it.
    if let Err(e) = state.messenger.reply(reply_token, ACK_RESEARCH).await {
        warn!(user_id, error = %e, "failed to send research acknowledgment");
    }

    let state = Arc::clone(state);
    let user_id = user_id.to_string();
    let query = query.to_string();
    tokio::spawn(async move {
        run_research(state, user_id, query, options).await;
    });
    Ok(())
}

/// Engine invocation wrapper: guarantees a terminal task status and walks
/// the session back to idle on every path.
async fn run_research(
    state: Arc<GatewayState>,
    user_id: String,
    query: String,
    options: ResearchOptions,
) {
    let outcome = state.engine.invoke(&query, &options).await;

    let _guard = state.sessions.guard(&user_id).await;
    match outcome {
        Ok(answer) => {
            if state.tasks.complete(&user_id) {
                for message in compose::chunk_result(&answer) {
                    if let Err(e) = state.messenger.push(&user_id, &message).await {
                        warn!(user_id, error = %e, "failed to push research result");
                    }
                }
            } else {
                info!(user_id, "discarding result of a cancelled research task");
            }
        },
        Err(e) => {
            warn!(user_id, error = %e, "research invocation failed");
            if state.tasks.fail(&user_id, e.to_string())
                && let Err(push_err) = state.messenger.push(&user_id, RESEARCH_FAILED).await
            {
                warn!(user_id, error = %push_err, "failed to push failure notice");
            }
        },
    }

    let mut session = state.sessions.get(&user_id);
    session.state = SessionState::Idle;
    state.sessions.update(&user_id, session);
}

async fn handle_media(
    state: &Arc<GatewayState>,
    user_id: &str,
    reply_token: &str,
    message_id: &str,
    kind: MediaKind,
) -> anyhow::Result<()> {
    if let Err(e) = state.messenger.reply(reply_token, ACK_CONTENT).await {
        warn!(user_id, error = %e, "failed to send content acknowledgment");
    }

    let accepted = match state.messenger.fetch_content(message_id).await {
        Ok(data) => match state.sink.process(message_id, kind, &data).await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!(user_id, message_id, error = %e, "content ingestion failed");
                false
            },
        },
        Err(e) => {
            warn!(user_id, message_id, error = %e, "content download failed");
            false
        },
    };

    let notice = if accepted { CONTENT_OK } else { CONTENT_FAILED };
    state.messenger.push(user_id, notice).await?;
    Ok(())
}

async fn handle_postback(
    state: &Arc<GatewayState>,
    user_id: &str,
    reply_token: &str,
    postback: Postback,
) -> anyhow::Result<()> {
    match PostbackAction::parse(&postback.data) {
        Ok(PostbackAction::Config { option, value }) => {
            apply_config(state, user_id, reply_token, option, &value).await
        },
        Ok(PostbackAction::CancelResearch) => {
            cancel_research(state, user_id, reply_token).await
        },
        Err(PostbackError::UnknownAction(action)) => {
            info!(user_id, action, "ignoring unknown postback action");
            Ok(())
        },
        Err(e) => {
            warn!(user_id, error = %e, "malformed postback payload");
            state.messenger.reply(reply_token, POSTBACK_ERROR).await?;
            Ok(())
        },
    }
}

async fn apply_config(
    state: &Arc<GatewayState>,
    user_id: &str,
    reply_token: &str,
    option: ConfigOption,
    value: &str,
) -> anyhow::Result<()> {
    let applied = {
        let _guard = state.sessions.guard(user_id).await;
        let mut session = state.sessions.get(user_id);
        let applied = match option {
            ConfigOption::WebSearch => match parse_bool(value) {
                Some(enabled) => {
                    session.config.enable_web_search = enabled;
                    true
                },
                None => false,
            },
            ConfigOption::MaxQueries => match value.parse::<u32>() {
                Ok(count) => {
                    session.config.max_search_queries = count;
                    true
                },
                Err(_) => false,
            },
            ConfigOption::ReportFormat => match ReportFormat::parse(value) {
                Some(format) => {
                    session.config.report_format = format;
                    true
                },
                None => false,
            },
        };
        if applied {
            state.sessions.update(user_id, session);
        }
        applied
    };

    if applied {
        state
            .messenger
            .reply(
                reply_token,
                &format!("Configuration updated: {} = {value}", option.as_str()),
            )
            .await?;
    } else {
        warn!(user_id, option = option.as_str(), value, "rejected config value");
        state.messenger.reply(reply_token, POSTBACK_ERROR).await?;
    }
    Ok(())
}

async fn cancel_research(
    state: &Arc<GatewayState>,
    user_id: &str,
    reply_token: &str,
) -> anyhow::Result<()> {
    let _guard = state.sessions.guard(user_id).await;
    if state.tasks.cancel(user_id) {
        let mut session = state.sessions.get(user_id);
        session.state = SessionState::Idle;
        state.sessions.update(user_id, session);
        state.messenger.reply(reply_token, CANCELLED).await?;
    } else {
        state.messenger.reply(reply_token, CANCEL_FAILED).await?;
    }
    Ok(())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "on" | "1" => Some(true),
        "false" | "off" | "0" => Some(false),
        _ => None,
    }
}
