//! Conversation state machine.
//!
//! [`advance`] is a pure function over a [`Session`]: it validates one
//! inbound message against the current state, mutates the session on
//! success and returns the reply to send. When the last parameter is
//! collected it also returns the [`ClipRequest`] to hand to the pipeline.
//! Nothing here performs I/O.

use clipbot_models::{
    is_supported_url, parse_seconds, AspectRatio, ClipRequest, ConversationState, InputError,
    InputResult, Session, TrimChoice,
};

use crate::transport::Keyboard;

pub const WELCOME_MESSAGE: &str = "👋 Welcome to the YouTube Video Processor Bot!\n\n\
     I can help you download, trim, and crop YouTube videos.\n\n\
     To get started, use the /download command.";
pub const ASK_FOR_URL: &str = "🔗 Please send me a YouTube video link.";
pub const ASK_TRIM_CHOICE: &str = "⏱️ Do you want to download the entire video or trim it?";
pub const ASK_START_TIME: &str = "⏲️ Enter the start time in seconds (e.g., 30 for 30 seconds):";
pub const ASK_END_TIME: &str = "⏲️ Enter the end time in seconds (e.g., 60 for 60 seconds):";
pub const ASK_RATIO: &str = "📏 Choose an aspect ratio for your video:";
pub const STARTING_PROCESSING: &str = "🎬 Starting video processing...";
pub const STILL_PROCESSING: &str =
    "⏳ Your video is still being processed. Please wait until it's done.";

/// Bot commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    /// Restart the conversation from the link prompt
    Download,
}

impl Command {
    /// Parse `/name`, `/name@botname` or `/name args`. Unknown commands are `None`.
    pub fn parse(text: &str) -> Option<Self> {
        let word = text.trim().split_whitespace().next()?.strip_prefix('/')?;
        let name = word.split('@').next().unwrap_or(word);
        match name.to_lowercase().as_str() {
            "start" => Some(Command::Start),
            "help" => Some(Command::Help),
            "download" => Some(Command::Download),
            _ => None,
        }
    }
}

/// One inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Command(Command),
    Text(String),
}

impl Input {
    pub fn parse(text: &str) -> Self {
        match Command::parse(text) {
            Some(command) => Input::Command(command),
            None => Input::Text(text.to_string()),
        }
    }
}

/// Reply to send back to the user.
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub text: String,
    pub keyboard: Keyboard,
}

impl Prompt {
    pub fn new(text: impl Into<String>, keyboard: Keyboard) -> Self {
        Self {
            text: text.into(),
            keyboard,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(text, Keyboard::None)
    }
}

/// Result of feeding one message to the state machine.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub prompt: Prompt,
    /// Set exactly when the session has just entered `Processing`
    pub dispatch: Option<ClipRequest>,
}

impl Transition {
    fn reply(prompt: Prompt) -> Self {
        Self {
            prompt,
            dispatch: None,
        }
    }
}

pub fn trim_keyboard() -> Keyboard {
    Keyboard::rows(TrimChoice::ALL.iter().map(TrimChoice::label), 2)
}

pub fn ratio_keyboard() -> Keyboard {
    Keyboard::rows(AspectRatio::ALL.iter().map(AspectRatio::label), 2)
}

/// Apply one message to `session`.
///
/// Invalid input leaves the session untouched and re-prompts. A session in
/// `Processing` is never mutated here; the pipeline resets it when the run
/// ends.
pub fn advance(session: &mut Session, input: Input) -> Transition {
    if session.state.is_processing() {
        return Transition::reply(Prompt::text(STILL_PROCESSING));
    }

    match input {
        Input::Command(Command::Start | Command::Help) => {
            Transition::reply(Prompt::text(WELCOME_MESSAGE))
        }
        Input::Command(Command::Download) => {
            session.reset();
            Transition::reply(Prompt::new(ASK_FOR_URL, Keyboard::Remove))
        }
        Input::Text(text) => match advance_text(session, text.trim()) {
            Ok(transition) => {
                session.touch();
                transition
            }
            Err(err) => Transition::reply(Prompt::new(err.to_string(), retry_keyboard(session.state))),
        },
    }
}

fn advance_text(session: &mut Session, text: &str) -> InputResult<Transition> {
    match session.state {
        ConversationState::AwaitingUrl => {
            if !is_supported_url(text) {
                return Err(InputError::NotAVideoLink);
            }
            session.source_url = Some(text.to_string());
            session.state = ConversationState::AwaitingTrimChoice;
            Ok(Transition::reply(Prompt::new(ASK_TRIM_CHOICE, trim_keyboard())))
        }

        ConversationState::AwaitingTrimChoice => {
            let choice: TrimChoice = text.parse().map_err(|_| InputError::UnknownChoice)?;
            match choice {
                TrimChoice::Whole => {
                    session.trim_requested = Some(false);
                    session.state = ConversationState::AwaitingRatio;
                    Ok(Transition::reply(Prompt::new(ASK_RATIO, ratio_keyboard())))
                }
                TrimChoice::Trim => {
                    session.trim_requested = Some(true);
                    session.state = ConversationState::AwaitingStartTime;
                    Ok(Transition::reply(Prompt::new(ASK_START_TIME, Keyboard::Remove)))
                }
            }
        }

        ConversationState::AwaitingStartTime => {
            let start = parse_seconds(text).ok_or(InputError::NotANumber("start"))?;
            if start < 0.0 {
                return Err(InputError::NegativeStart);
            }
            session.start_time = Some(start);
            session.state = ConversationState::AwaitingEndTime;
            Ok(Transition::reply(Prompt::text(ASK_END_TIME)))
        }

        ConversationState::AwaitingEndTime => {
            let end = parse_seconds(text).ok_or(InputError::NotANumber("end"))?;
            let start = session.start_time.unwrap_or(0.0);
            if end <= start {
                return Err(InputError::EndNotAfterStart { start });
            }
            session.end_time = Some(end);
            session.state = ConversationState::AwaitingRatio;
            Ok(Transition::reply(Prompt::new(ASK_RATIO, ratio_keyboard())))
        }

        ConversationState::AwaitingRatio => {
            let ratio: AspectRatio = text.parse().map_err(|_| InputError::UnknownChoice)?;
            let Some(source_url) = session.source_url.clone() else {
                session.reset();
                return Ok(Transition::reply(Prompt::new(ASK_FOR_URL, Keyboard::Remove)));
            };

            session.aspect_ratio = Some(ratio);
            session.state = ConversationState::Processing;
            let request = ClipRequest::new(session.user_id, source_url, session.trim_range(), ratio);

            Ok(Transition {
                prompt: Prompt::new(STARTING_PROCESSING, Keyboard::Remove),
                dispatch: Some(request),
            })
        }

        ConversationState::Processing => Ok(Transition::reply(Prompt::text(STILL_PROCESSING))),
    }
}

/// Keyboard to re-offer after a rejected message.
fn retry_keyboard(state: ConversationState) -> Keyboard {
    match state {
        ConversationState::AwaitingTrimChoice => trim_keyboard(),
        ConversationState::AwaitingRatio => ratio_keyboard(),
        _ => Keyboard::None,
    }
}
