//! Text panels sent to the chat. Everything here is a pure function of the
//! session state, so a redraw always produces the same messages.

use teloxide::utils::html;

use crate::workflow::{GenerationOptions, ProgressUpdate, QuizOrigin, WorkflowState};

const BAR_CELLS: usize = 20;
const SEPARATOR: &str = "———";

pub const HELP_TEXT: &str = "<b>How the generation integration works</b>

1. <b>Prompt creation:</b> a prompt asks the generation service for a quiz on the selected subject
2. <b>API call:</b> the prompt is sent to the generation service
3. <b>Response processing:</b> the JSON in the answer is extracted and checked against the quiz format
4. <b>CMS formatting:</b> the quiz is prepared for the CMS quiz plugin
5. <b>Page generation:</b> a page is created with the quiz embedded

You can switch between sample data and real generation before each run. \
If the service is unavailable, sample data is used instead.

/reset starts over, /help shows this message.";

pub fn render_progress(update: &ProgressUpdate) -> String {
    let filled = (update.percent as usize * BAR_CELLS / 100).min(BAR_CELLS);
    format!(
        "<code>{}{}</code> {}%\n{}",
        "▓".repeat(filled),
        "░".repeat(BAR_CELLS - filled),
        update.percent,
        html::escape(&update.status)
    )
}

pub fn render_options(options: &GenerationOptions, has_credential: bool) -> String {
    let mode = match (options.use_generation, has_credential) {
        (false, _) => "sample data",
        (true, true) => "generation service",
        (true, false) => "generation service (no API key, sample data will be used)",
    };
    format!(
        "<b>Quiz generation controls</b>\nSubject: {}\nQuestions: {}\nSource: {}",
        options.subject, options.question_count, mode
    )
}

/// Telegram rejects messages longer than this many UTF-16 code units.
pub const MESSAGE_LIMIT: usize = 4096;

const MAX_TITLE_CHARS: usize = 200;
const MAX_QUESTION_CHARS: usize = 300;
const MAX_OPTION_CHARS: usize = 100;
const MAX_NOTICE_CHARS: usize = 300;

/// Cuts generated text to `max` characters before it is escaped.
fn clip(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((end, _)) => format!("{}…", &text[..end]),
        None => text.to_string(),
    }
}

fn message_len(text: &str) -> usize {
    text.encode_utf16().count()
}

/// Generated quiz panel, split into as many messages as needed to stay under
/// `MESSAGE_LIMIT`, or `None` until a run has completed.
pub fn render_quiz_panel(state: &WorkflowState) -> Option<Vec<String>> {
    let quiz = state.quiz.as_ref().filter(|_| state.generated)?;

    let mut header = format!(
        "📊 <b>Generated Quiz</b>\n{}\n",
        html::bold(&html::escape(&clip(&quiz.title, MAX_TITLE_CHARS)))
    );
    let source = match state.origin {
        Some(QuizOrigin::Generated) => "generation service",
        _ => "sample data",
    };
    header.push_str(&html::italic(&format!("Source: {}", source)));
    header.push('\n');
    if let Some(notice) = &state.fallback_notice {
        header.push_str(&format!("⚠️ {}\n", html::escape(&clip(notice, MAX_NOTICE_CHARS))));
    }

    let mut messages = Vec::new();
    let mut current = header;
    for (i, question) in quiz.questions.iter().take(state.question_count as usize).enumerate() {
        let mut block = String::from("\n");
        block.push_str(&html::bold(&format!(
            "Q{}: {}",
            i + 1,
            html::escape(&clip(&question.question, MAX_QUESTION_CHARS))
        )));
        block.push('\n');
        for (j, option) in question.options.iter().enumerate() {
            let option = html::escape(&clip(option, MAX_OPTION_CHARS));
            if question.is_correct(j) {
                block.push_str(&format!("- ✅ {}\n", option));
            } else {
                block.push_str(&format!("- {}\n", option));
            }
        }
        block.push_str(SEPARATOR);
        block.push('\n');

        if message_len(&current) + message_len(&block) > MESSAGE_LIMIT {
            messages.push(std::mem::take(&mut current));
        }
        current.push_str(&block);
    }
    messages.push(current);

    Some(messages)
}

/// Mocked CMS page that the run pretends to have created.
pub fn render_page_preview(state: &WorkflowState, host: &str) -> Option<String> {
    let quiz = state.quiz.as_ref().filter(|_| state.generated)?;
    let title = html::escape(&clip(&quiz.title, MAX_TITLE_CHARS));
    let date = state
        .completed_on
        .map(|date| date.format("%B %d, %Y").to_string())
        .unwrap_or_default();

    Some(format!(
        "📄 <b>Page Preview</b>\n\n\
         {}\n\
         Test your knowledge with this interactive quiz!\n\
         <code>[ Start Quiz ]</code>  <code>[ View Past Results ]</code>\n\
         {}\n\
         <b>Page details:</b>\n\
         ✅ <b>Page Title:</b> {}\n\
         ✅ <b>Category:</b> {}\n\
         ✅ <b>URL:</b> {}/{}\n\
         ✅ <b>Questions:</b> {} questions created\n\
         ✅ <b>Date:</b> {}",
        html::bold(&title),
        SEPARATOR,
        title,
        html::escape(&state.subject.category()),
        html::escape(host),
        state.subject.slug(),
        state.displayed_questions(),
        date
    ))
}
