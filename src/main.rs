mod config;
mod quiz;
mod render;
mod workflow;

use std::sync::Arc;

use async_trait::async_trait;
use config::Config;
use dotenv::dotenv;
use quiz::ai_helper::{Credential, QuizGenerator, QuizHelper, MIN_KEY_LENGTH};
use quiz::samples::SampleQuizzes;
use quiz::Subject;
use teloxide::{
    dispatching::dialogue::{ErasedStorage, InMemStorage, Storage},
    prelude::*,
    types::{ChatAction, ChatId, KeyboardButton, KeyboardMarkup, KeyboardRemove, MessageId, ParseMode},
};
use workflow::{
    GenerationOptions, Pacing, ProgressSink, ProgressUpdate, Workflow, WorkflowState,
    MAX_QUESTIONS, MIN_QUESTIONS,
};

type QuizDialogue = Dialogue<State, ErasedStorage<State>>;
type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;
type SessionStorage = std::sync::Arc<ErasedStorage<State>>;

/// Per-chat session. Lives only in memory.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub enum State {
    #[default]
    Start,
    ReceiveSubject,
    ReceiveQuestionCount {
        subject: Subject,
    },
    ReceiveMode {
        subject: Subject,
        question_count: u8,
    },
    ReceiveApiKey {
        options: GenerationOptions,
    },
    ReadyToGenerate {
        session: Session,
    },
    Generated {
        session: Session,
        workflow: WorkflowState,
    },
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Session {
    options: GenerationOptions,
    credential: Option<Credential>,
}

struct BotContext {
    config: Config,
    samples: SampleQuizzes,
}

impl BotContext {
    /// A key typed into the chat wins over the environment one.
    fn credential<'a>(&'a self, session: &'a Session) -> Option<&'a Credential> {
        session
            .credential
            .as_ref()
            .or(self.config.api_key.as_ref())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    pretty_env_logger::init();

    let config = Config::from_env()?;
    if config.api_key.is_none() {
        log::warn!("CHATGPT_API_KEY is not set, real generation needs a key entered in chat");
    }
    log::info!("Starting quiz page bot...");

    let bot = Bot::from_env();
    let storage: SessionStorage = InMemStorage::<State>::new().erase();
    let context = Arc::new(BotContext {
        config,
        samples: SampleQuizzes::builtin(),
    });

    Dispatcher::builder(
        bot,
        Update::filter_message()
            .enter_dialogue::<Message, ErasedStorage<State>, State>()
            .branch(dptree::filter(|msg: Message| is_command(&msg, "/help")).endpoint(help))
            .branch(
                dptree::filter(|msg: Message| {
                    is_command(&msg, "/start") || is_command(&msg, "/reset")
                })
                .endpoint(start),
            )
            .branch(dptree::case![State::Start].endpoint(start))
            .branch(dptree::case![State::ReceiveSubject].endpoint(receive_subject))
            .branch(
                dptree::case![State::ReceiveQuestionCount { subject }]
                    .endpoint(receive_question_count),
            )
            .branch(
                dptree::case![State::ReceiveMode {
                    subject,
                    question_count
                }]
                .endpoint(receive_mode),
            )
            .branch(dptree::case![State::ReceiveApiKey { options }].endpoint(receive_api_key))
            .branch(
                dptree::case![State::ReadyToGenerate { session }].endpoint(ready_to_generate),
            )
            .branch(dptree::case![State::Generated { session, workflow }].endpoint(generated)),
    )
    .dependencies(dptree::deps![storage, context])
    .enable_ctrlc_handler()
    .build()
    .dispatch()
    .await;

    Ok(())
}

fn is_command(msg: &Message, command: &str) -> bool {
    msg.text()
        .and_then(|text| text.split_whitespace().next())
        .map(|first| first == command)
        .unwrap_or(false)
}

const GREETING_TEXT: &str = "Hi! I generate a knowledge quiz and show the page it would be published on. Pick a subject to begin.";
const USE_GENERATION: &str = "Use generation service";
const USE_SAMPLES: &str = "Use sample data";
const CONTINUE_WITHOUT_KEY: &str = "Continue without key";
const GENERATE: &str = "Generate quiz & page";
const REGENERATE: &str = "Generate again";
const SHOW_AGAIN: &str = "Show again";
const CHANGE_OPTIONS: &str = "Change options";

fn subject_keyboard() -> KeyboardMarkup {
    KeyboardMarkup::new(
        Subject::ALL
            .chunks(3)
            .map(|row| {
                row.iter()
                    .map(|subject| KeyboardButton::new(subject.name()))
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>(),
    )
}

fn count_keyboard() -> KeyboardMarkup {
    let counts: Vec<u8> = (MIN_QUESTIONS..=MAX_QUESTIONS).collect();
    KeyboardMarkup::new(
        counts
            .chunks(4)
            .map(|row| {
                row.iter()
                    .map(|count| KeyboardButton::new(count.to_string()))
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>(),
    )
}

async fn help(bot: Bot, msg: Message) -> HandlerResult {
    bot.send_message(msg.chat.id, render::HELP_TEXT)
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}

async fn start(bot: Bot, dialogue: QuizDialogue, msg: Message) -> HandlerResult {
    bot.send_message(msg.chat.id, GREETING_TEXT)
        .reply_markup(subject_keyboard())
        .await?;

    dialogue.update(State::ReceiveSubject).await?;
    Ok(())
}

async fn receive_subject(bot: Bot, dialogue: QuizDialogue, msg: Message) -> HandlerResult {
    let subject = match msg.text().map(str::parse::<Subject>) {
        Some(Ok(subject)) => subject,
        _ => {
            bot.send_message(msg.chat.id, "Please choose one of the subjects")
                .reply_markup(subject_keyboard())
                .await?;
            return Ok(());
        }
    };

    bot.send_message(
        msg.chat.id,
        format!(
            "{} it is. How many questions ({}-{})?",
            subject, MIN_QUESTIONS, MAX_QUESTIONS
        ),
    )
    .reply_markup(count_keyboard())
    .await?;

    dialogue
        .update(State::ReceiveQuestionCount { subject })
        .await?;
    Ok(())
}

async fn receive_question_count(
    bot: Bot,
    dialogue: QuizDialogue,
    subject: Subject,
    msg: Message,
) -> HandlerResult {
    let question_count = match msg.text().map(|text| text.trim().parse::<u8>()) {
        Some(Ok(count)) if (MIN_QUESTIONS..=MAX_QUESTIONS).contains(&count) => count,
        _ => {
            bot.send_message(
                msg.chat.id,
                format!(
                    "Please enter a number between {} and {}",
                    MIN_QUESTIONS, MAX_QUESTIONS
                ),
            )
            .reply_markup(count_keyboard())
            .await?;
            return Ok(());
        }
    };

    let keyboard = KeyboardMarkup::new(vec![vec![
        KeyboardButton::new(USE_GENERATION),
        KeyboardButton::new(USE_SAMPLES),
    ]]);
    bot.send_message(msg.chat.id, "Where should the questions come from?")
        .reply_markup(keyboard)
        .await?;

    dialogue
        .update(State::ReceiveMode {
            subject,
            question_count,
        })
        .await?;
    Ok(())
}

async fn receive_mode(
    bot: Bot,
    dialogue: QuizDialogue,
    (subject, question_count): (Subject, u8),
    msg: Message,
    context: Arc<BotContext>,
) -> HandlerResult {
    let use_generation = match msg.text() {
        Some(USE_GENERATION) => true,
        Some(USE_SAMPLES) => false,
        _ => {
            bot.send_message(msg.chat.id, "Please choose one of the options")
                .await?;
            return Ok(());
        }
    };
    let options = GenerationOptions::new(subject, question_count, use_generation);

    if use_generation && context.config.api_key.is_none() {
        let keyboard = KeyboardMarkup::new(vec![vec![
            KeyboardButton::new(USE_SAMPLES),
            KeyboardButton::new(CONTINUE_WITHOUT_KEY),
        ]]);
        bot.send_message(
            msg.chat.id,
            "⚠️ No API key is configured. Send your key to enable real quiz generation, or use sample data.\n\
             A key is a single line of at least 20 characters, usually starting with \"sk-\".",
        )
        .reply_markup(keyboard)
        .await?;
        dialogue.update(State::ReceiveApiKey { options }).await?;
        return Ok(());
    }

    let session = Session {
        options,
        credential: None,
    };
    send_ready(&bot, msg.chat.id, &session, &context).await?;
    dialogue.update(State::ReadyToGenerate { session }).await?;
    Ok(())
}

async fn receive_api_key(
    bot: Bot,
    dialogue: QuizDialogue,
    mut options: GenerationOptions,
    msg: Message,
    context: Arc<BotContext>,
) -> HandlerResult {
    let credential = match msg.text().map(str::trim) {
        Some(USE_SAMPLES) => {
            options.use_generation = false;
            None
        }
        Some(CONTINUE_WITHOUT_KEY) => None,
        Some(text) => match Credential::from_input(text) {
            Some(credential) => {
                // The key should not linger in the chat history.
                if let Err(err) = bot.delete_message(msg.chat.id, msg.id).await {
                    log::warn!("Could not delete message with API key: {}", err);
                }
                Some(credential)
            }
            None => {
                bot.send_message(
                    msg.chat.id,
                    format!(
                        "That does not look like an API key. Send the key as one line of at least {} \
                         characters without spaces (usually \"sk-...\"), or pick one of the buttons.",
                        MIN_KEY_LENGTH
                    ),
                )
                .await?;
                return Ok(());
            }
        },
        None => {
            bot.send_message(msg.chat.id, "Please send the key as a single line of text")
                .await?;
            return Ok(());
        }
    };

    let session = Session {
        options,
        credential,
    };
    send_ready(&bot, msg.chat.id, &session, &context).await?;
    dialogue.update(State::ReadyToGenerate { session }).await?;
    Ok(())
}

async fn send_ready(
    bot: &Bot,
    chat_id: ChatId,
    session: &Session,
    context: &BotContext,
) -> HandlerResult {
    let keyboard = KeyboardMarkup::new(vec![
        vec![KeyboardButton::new(GENERATE)],
        vec![KeyboardButton::new(CHANGE_OPTIONS)],
    ]);
    let has_credential = context.credential(session).is_some();
    bot.send_message(chat_id, render::render_options(&session.options, has_credential))
        .parse_mode(ParseMode::Html)
        .reply_markup(keyboard)
        .await?;
    Ok(())
}

async fn ready_to_generate(
    bot: Bot,
    dialogue: QuizDialogue,
    session: Session,
    msg: Message,
    context: Arc<BotContext>,
) -> HandlerResult {
    match msg.text() {
        Some(GENERATE) => run_and_show(bot, dialogue, msg.chat.id, session, context).await,
        Some(CHANGE_OPTIONS) => start(bot, dialogue, msg).await,
        _ => {
            send_ready(&bot, msg.chat.id, &session, &context).await?;
            Ok(())
        }
    }
}

async fn generated(
    bot: Bot,
    dialogue: QuizDialogue,
    (session, workflow): (Session, WorkflowState),
    msg: Message,
    context: Arc<BotContext>,
) -> HandlerResult {
    match msg.text() {
        Some(REGENERATE) => run_and_show(bot, dialogue, msg.chat.id, session, context).await,
        Some(SHOW_AGAIN) => show_panels(&bot, msg.chat.id, &workflow, &context).await,
        Some(CHANGE_OPTIONS) => start(bot, dialogue, msg).await,
        _ => {
            bot.send_message(msg.chat.id, "Please choose one of the options")
                .reply_markup(generated_keyboard())
                .await?;
            Ok(())
        }
    }
}

/// Edits one chat message in place as the workflow advances.
struct ChatProgress {
    bot: Bot,
    chat_id: ChatId,
    message_id: MessageId,
}

#[async_trait]
impl ProgressSink for ChatProgress {
    async fn report(&self, update: &ProgressUpdate) {
        let edited = self
            .bot
            .edit_message_text(self.chat_id, self.message_id, render::render_progress(update))
            .parse_mode(ParseMode::Html)
            .await;
        if let Err(err) = edited {
            log::warn!("Failed to update progress message: {}", err);
        }
    }
}

async fn run_and_show(
    bot: Bot,
    dialogue: QuizDialogue,
    chat_id: ChatId,
    session: Session,
    context: Arc<BotContext>,
) -> HandlerResult {
    // Drop any previous result before the new run starts.
    dialogue
        .update(State::ReadyToGenerate {
            session: session.clone(),
        })
        .await?;

    let _ = bot.send_chat_action(chat_id, ChatAction::Typing).await;
    let progress_message = bot
        .send_message(
            chat_id,
            render::render_progress(&ProgressUpdate {
                percent: 0,
                status: "Starting...".to_string(),
            }),
        )
        .parse_mode(ParseMode::Html)
        .reply_markup(KeyboardRemove::new())
        .await?;
    let progress = ChatProgress {
        bot: bot.clone(),
        chat_id,
        message_id: progress_message.id,
    };

    let helper = QuizHelper::connect(
        context.credential(&session),
        context.config.engine,
        context.config.generation_timeout,
    )
    .ok()
    .map(|helper| match &context.config.api_url {
        Some(api_url) => helper.with_api_url(api_url.clone()),
        None => helper,
    });
    let generator = helper.as_ref().map(|helper| helper as &dyn QuizGenerator);

    let workflow = Workflow::new(&context.samples, Pacing::new(context.config.pacing_scale))
        .run(&session.options, generator, &progress)
        .await;

    // The result is kept even if sending a panel fails, so "Show again" can retry.
    dialogue
        .update(State::Generated {
            session,
            workflow: workflow.clone(),
        })
        .await?;
    show_panels(&bot, chat_id, &workflow, &context).await
}

fn generated_keyboard() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![
        vec![
            KeyboardButton::new(REGENERATE),
            KeyboardButton::new(SHOW_AGAIN),
        ],
        vec![KeyboardButton::new(CHANGE_OPTIONS)],
    ])
}

async fn show_panels(
    bot: &Bot,
    chat_id: ChatId,
    workflow: &WorkflowState,
    context: &BotContext,
) -> HandlerResult {
    let panels = render::render_quiz_panel(workflow)
        .unwrap_or_default()
        .into_iter()
        .chain(render::render_page_preview(workflow, &context.config.page_host));
    for panel in panels {
        bot.send_message(chat_id, panel)
            .parse_mode(ParseMode::Html)
            .reply_markup(generated_keyboard())
            .await?;
    }
    Ok(())
}
