use std::sync::Arc;

use anyhow::Context;
use chrono::{Local, NaiveDate};
use dotenv::dotenv;
use teloxide::{
    dispatching::dialogue::{serializer::Json, ErasedStorage, SqliteStorage, Storage},
    prelude::*,
    types::{ChatId, KeyboardButton, KeyboardMarkup, KeyboardRemove},
};
use vocab_quiz::{Config, Leaderboard, Phase, QuizError, SessionState, SubmitReport, Vocabulary};

type QuizDialogue = Dialogue<State, ErasedStorage<State>>;
type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;
type SessionStorage = std::sync::Arc<ErasedStorage<State>>;

#[derive(Clone, Default, serde::Serialize, serde::Deserialize)]
pub enum State {
    #[default]
    Start,
    ReceiveNickname,
    ReceiveQuizDate {
        session: SessionState,
    },
    Quiz {
        session: SessionState,
        question: usize,
    },
    Results {
        session: SessionState,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    pretty_env_logger::init();
    log::info!("Starting vocabulary quiz bot...");

    let config = Config::from_env().context("invalid configuration")?;
    let vocabulary =
        Vocabulary::load(&config.vocab_file).context("cannot start without a vocabulary")?;
    let leaderboard = Leaderboard::new(&config.rank_file);

    log::info!("Opening session storage at {}", config.session_db);
    let storage: SessionStorage = SqliteStorage::open(&config.session_db, Json)
        .await
        .context("failed to open session storage")?
        .erase();

    let bot = Bot::from_env();

    Dispatcher::builder(
        bot,
        Update::filter_message()
            .enter_dialogue::<Message, ErasedStorage<State>, State>()
            .branch(dptree::case![State::Start].endpoint(start))
            .branch(dptree::case![State::ReceiveNickname].endpoint(receive_nickname))
            .branch(dptree::case![State::ReceiveQuizDate { session }].endpoint(receive_quiz_date))
            .branch(dptree::case![State::Quiz { session, question }].endpoint(receive_answer))
            .branch(dptree::case![State::Results { session }].endpoint(receive_results_action)),
    )
    .dependencies(dptree::deps![
        storage,
        Arc::new(vocabulary),
        Arc::new(leaderboard),
        Arc::new(config)
    ])
    .enable_ctrlc_handler()
    .build()
    .dispatch()
    .await;

    Ok(())
}

const GREETING_TEXT: &str = "📘 Vocabulary Quiz\n\nEnter your nickname to start:";
const TODAY: &str = "Today";
const SUBMIT: &str = "✅ Submit All";
const BACK: &str = "◀ Back";
const RETRY: &str = "🔁 Retry Wrong Questions";
const NEW_QUIZ: &str = "🔄 New Quiz";
const LEADERBOARD: &str = "🏆 Leaderboard";

async fn start(bot: Bot, dialogue: QuizDialogue, msg: Message) -> HandlerResult {
    bot.send_message(msg.chat.id, GREETING_TEXT)
        .reply_markup(KeyboardRemove::new())
        .await?;

    dialogue.update(State::ReceiveNickname).await?;
    Ok(())
}

async fn receive_nickname(bot: Bot, dialogue: QuizDialogue, msg: Message) -> HandlerResult {
    let Some(name) = msg.text() else {
        bot.send_message(msg.chat.id, "Please send your nickname as text")
            .await?;
        return Ok(());
    };

    let session = match SessionState::new().on_nickname_submit(name) {
        Ok(session) => session,
        Err(QuizError::InvalidNickname) => {
            bot.send_message(msg.chat.id, "The nickname can't be empty, try again")
                .await?;
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    ask_quiz_date(&bot, msg.chat.id).await?;
    dialogue.update(State::ReceiveQuizDate { session }).await?;
    Ok(())
}

async fn ask_quiz_date(bot: &Bot, chat_id: ChatId) -> HandlerResult {
    bot.send_message(
        chat_id,
        "Pick the quiz date (YYYY-MM-DD). The same date always gives you the same quiz.",
    )
    .reply_markup(KeyboardMarkup::new(vec![vec![KeyboardButton::new(TODAY)]]))
    .await?;
    Ok(())
}

fn parse_quiz_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.eq_ignore_ascii_case(TODAY) {
        return Some(Local::now().date_naive());
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()
}

async fn receive_quiz_date(
    bot: Bot,
    dialogue: QuizDialogue,
    session: SessionState,
    vocabulary: Arc<Vocabulary>,
    config: Arc<Config>,
    msg: Message,
) -> HandlerResult {
    let Some(date) = msg.text().and_then(parse_quiz_date) else {
        bot.send_message(msg.chat.id, "Please send a date like 2024-01-01")
            .await?;
        return Ok(());
    };

    let session = match session.on_generate(vocabulary.entries(), config.quiz_size, date) {
        Ok(session) => session,
        Err(e @ QuizError::InsufficientPool { .. }) => {
            log::error!("Cannot build a quiz: {}", e);
            bot.send_message(
                msg.chat.id,
                format!("❌ The vocabulary is too small for a quiz: {}", e),
            )
            .await?;
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    if session.phase() != Phase::InProgress {
        bot.send_message(msg.chat.id, "❌ There are no words to ask about")
            .await?;
        return Ok(());
    }

    bot.send_message(
        msg.chat.id,
        format!(
            "👤 {} | 🗓 {} | {} questions",
            session.nickname().unwrap_or_default(),
            date,
            session.quiz().len()
        ),
    )
    .await?;
    send_question(&bot, msg.chat.id, &session, 0).await?;

    dialogue
        .update(State::Quiz {
            session,
            question: 0,
        })
        .await?;
    Ok(())
}

async fn send_question(bot: &Bot, chat_id: ChatId, session: &SessionState, idx: usize) -> HandlerResult {
    let mut controls = vec![KeyboardButton::new(SUBMIT)];
    if idx > 0 {
        controls.insert(0, KeyboardButton::new(BACK));
    }

    let Some(prompt) = session.prompt(idx) else {
        bot.send_message(chat_id, "All questions answered. Submit when you are ready.")
            .reply_markup(KeyboardMarkup::new(vec![controls]))
            .await?;
        return Ok(());
    };

    let mut rows: Vec<Vec<KeyboardButton>> = prompt
        .choices
        .iter()
        .map(|choice| vec![KeyboardButton::new(choice.clone())])
        .collect();
    rows.push(controls);

    let mut text = format!(
        "Q{}/{} ({})\n{}",
        idx + 1,
        session.quiz().len(),
        prompt.direction,
        prompt.text
    );
    if let Some(selected) = prompt.selected {
        text.push_str(&format!("\n\nYour answer: {}", selected));
    }
    bot.send_message(chat_id, text)
        .reply_markup(KeyboardMarkup::new(rows))
        .await?;
    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
enum QuizInput<'a> {
    Submit,
    Back,
    Choice(&'a str),
    Unknown,
}

fn classify_input<'a>(session: &SessionState, question: usize, text: &'a str) -> QuizInput<'a> {
    match text {
        SUBMIT => QuizInput::Submit,
        BACK if question > 0 => QuizInput::Back,
        _ => match session.prompt(question) {
            Some(prompt) if prompt.choices.iter().any(|c| c == text) => QuizInput::Choice(text),
            _ => QuizInput::Unknown,
        },
    }
}

async fn receive_answer(
    bot: Bot,
    dialogue: QuizDialogue,
    (session, question): (SessionState, usize),
    leaderboard: Arc<Leaderboard>,
    config: Arc<Config>,
    msg: Message,
) -> HandlerResult {
    let Some(text) = msg.text() else {
        bot.send_message(msg.chat.id, "Please pick one of the choices")
            .await?;
        return Ok(());
    };

    let next = match classify_input(&session, question, text) {
        QuizInput::Submit => {
            let (session, report) = session.on_submit(&leaderboard);
            if let Some(report) = report {
                send_results(&bot, msg.chat.id, &session, &report).await?;
            }
            bot.send_message(msg.chat.id, leaderboard_text(&leaderboard, config.leaderboard_size))
                .await?;
            dialogue.update(State::Results { session }).await?;
            return Ok(());
        }
        QuizInput::Back => (session, question - 1),
        QuizInput::Choice(choice) => (session.on_answer_change(question, choice), question + 1),
        QuizInput::Unknown => {
            bot.send_message(msg.chat.id, "Please pick one of the choices")
                .await?;
            return Ok(());
        }
    };

    let (session, question) = next;
    send_question(&bot, msg.chat.id, &session, question).await?;

    dialogue.update(State::Quiz { session, question }).await?;
    Ok(())
}

async fn send_results(
    bot: &Bot,
    chat_id: ChatId,
    session: &SessionState,
    report: &SubmitReport,
) -> HandlerResult {
    let mut text = format!("🎉 Score: {} / {}", report.score, report.total);

    let mistakes = session.mistakes();
    if !mistakes.is_empty() {
        text.push_str("\n\n❌ Incorrect Answers");
        for (item, given) in mistakes {
            text.push_str(&format!(
                "\n- {}\n  Your answer: {} | Correct: ✅ {}",
                item.prompt,
                given.unwrap_or("(no answer)"),
                item.answer
            ));
        }
    }
    if !report.saved {
        text.push_str("\n\n⚠️ Your result could not be saved to the leaderboard.");
    }

    bot.send_message(chat_id, text)
        .reply_markup(results_keyboard(session))
        .await?;
    Ok(())
}

fn results_keyboard(session: &SessionState) -> KeyboardMarkup {
    let mut rows = Vec::new();
    if session.can_retry() {
        rows.push(vec![KeyboardButton::new(RETRY)]);
    }
    rows.push(vec![
        KeyboardButton::new(NEW_QUIZ),
        KeyboardButton::new(LEADERBOARD),
    ]);
    KeyboardMarkup::new(rows)
}

fn leaderboard_text(leaderboard: &Leaderboard, size: usize) -> String {
    match leaderboard.top(size) {
        Ok(entries) if entries.is_empty() => "No rankings saved yet.".to_string(),
        Ok(entries) => {
            let rows = entries
                .iter()
                .enumerate()
                .map(|(i, e)| {
                    format!(
                        "{}. {} | {} correct | {} wrong | {}",
                        i + 1,
                        e.nickname,
                        e.score,
                        e.wrong_count,
                        e.date
                    )
                })
                .collect::<Vec<_>>()
                .join("\n");
            format!("🏆 Leaderboard (Top {})\n{}", size, rows)
        }
        Err(e) => {
            log::warn!("{}", e);
            "⚠️ The leaderboard is unavailable right now.".to_string()
        }
    }
}

async fn receive_results_action(
    bot: Bot,
    dialogue: QuizDialogue,
    session: SessionState,
    leaderboard: Arc<Leaderboard>,
    config: Arc<Config>,
    msg: Message,
) -> HandlerResult {
    match msg.text() {
        Some(RETRY) if session.can_retry() => {
            let session = session.on_retry();
            bot.send_message(
                msg.chat.id,
                format!("🔁 Retrying {} questions", session.quiz().len()),
            )
            .await?;
            send_question(&bot, msg.chat.id, &session, 0).await?;
            dialogue
                .update(State::Quiz {
                    session,
                    question: 0,
                })
                .await?;
        }
        Some(NEW_QUIZ) => {
            let session = session.on_new_quiz();
            ask_quiz_date(&bot, msg.chat.id).await?;
            dialogue.update(State::ReceiveQuizDate { session }).await?;
        }
        Some(LEADERBOARD) => {
            bot.send_message(msg.chat.id, leaderboard_text(&leaderboard, config.leaderboard_size))
                .reply_markup(results_keyboard(&session))
                .await?;
        }
        _ => {
            bot.send_message(msg.chat.id, "Please choose one of the options")
                .reply_markup(results_keyboard(&session))
                .await?;
        }
    }
    Ok(())
}
