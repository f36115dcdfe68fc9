use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::quiz::ai_helper::{build_quiz_prompt, GenerationError, QuizGenerator};
use crate::quiz::extract::{extract_json, ExtractError};
use crate::quiz::samples::SampleQuizzes;
use crate::quiz::{Quiz, Subject, ValidationError};

pub const MIN_QUESTIONS: u8 = 3;
pub const MAX_QUESTIONS: u8 = 10;
pub const MAX_PACING_SCALE: f64 = 10.0;

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GenerationOptions {
    pub subject: Subject,
    pub question_count: u8,
    pub use_generation: bool,
}

impl GenerationOptions {
    pub fn new(subject: Subject, question_count: u8, use_generation: bool) -> Self {
        Self {
            subject,
            question_count: question_count.clamp(MIN_QUESTIONS, MAX_QUESTIONS),
            use_generation,
        }
    }
}

#[derive(Debug, Error)]
pub enum QuizSourceError {
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum QuizOrigin {
    Generated,
    Sample,
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct WorkflowState {
    pub generated: bool,
    pub progress: u8,
    pub quiz: Option<Quiz>,
    pub subject: Subject,
    pub question_count: u8,
    pub origin: Option<QuizOrigin>,
    pub fallback_notice: Option<String>,
    pub status: String,
    pub completed_on: Option<NaiveDate>,
}

impl WorkflowState {
    /// Questions that will actually be shown: never more than requested.
    pub fn displayed_questions(&self) -> usize {
        self.quiz
            .as_ref()
            .map(|quiz| quiz.questions.len().min(self.question_count as usize))
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    SubjectSelected,
    Generating,
    Formatting,
    CreatingPage,
    AddingButtons,
    AssigningCategory,
}

impl Step {
    pub const ALL: [Step; 6] = [
        Step::SubjectSelected,
        Step::Generating,
        Step::Formatting,
        Step::CreatingPage,
        Step::AddingButtons,
        Step::AssigningCategory,
    ];

    pub fn percent(&self) -> u8 {
        match self {
            Step::SubjectSelected => 10,
            Step::Generating => 30,
            Step::Formatting => 50,
            Step::CreatingPage => 70,
            Step::AddingButtons => 85,
            Step::AssigningCategory => 100,
        }
    }

    pub fn status(&self, subject: Subject) -> String {
        match self {
            Step::SubjectSelected => format!("Step 1: Subject selected - {}", subject),
            Step::Generating => "Step 2: Generating quiz content...".to_string(),
            Step::Formatting => "Step 3: Formatting quiz for the CMS quiz plugin...".to_string(),
            Step::CreatingPage => "Step 4: Creating new CMS page...".to_string(),
            Step::AddingButtons => "Step 5: Adding quiz buttons and linking quiz...".to_string(),
            Step::AssigningCategory => {
                format!("Step 6: Assigning to category: {}", subject.category())
            }
        }
    }

    fn pause(&self, simulated_generation: bool) -> Duration {
        match self {
            Step::SubjectSelected | Step::AssigningCategory => Duration::from_millis(500),
            Step::Generating if simulated_generation => Duration::from_millis(1000),
            Step::Generating => Duration::ZERO,
            Step::Formatting | Step::CreatingPage | Step::AddingButtons => {
                Duration::from_millis(700)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    pub percent: u8,
    pub status: String,
}

/// Receives every progress change of a run. Delivery failures are the sink's
/// own business; the workflow never waits on them to decide anything.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn report(&self, update: &ProgressUpdate);
}

/// Stepped animation timing. Scale 0 turns all pauses off; anything outside
/// `0..=MAX_PACING_SCALE` is clamped so pauses stay representable.
#[derive(Debug, Clone, Copy)]
pub struct Pacing {
    scale: f64,
}

impl Pacing {
    pub fn new(scale: f64) -> Self {
        let scale = if scale.is_nan() {
            0.0
        } else {
            scale.clamp(0.0, MAX_PACING_SCALE)
        };
        Self { scale }
    }

    async fn pause(&self, base: Duration) {
        let pause = base.mul_f64(self.scale);
        if !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }
    }
}

pub struct Workflow<'a> {
    samples: &'a SampleQuizzes,
    pacing: Pacing,
}

impl<'a> Workflow<'a> {
    pub fn new(samples: &'a SampleQuizzes, pacing: Pacing) -> Self {
        Self { samples, pacing }
    }

    /// Runs every step in order and returns the terminal state.
    ///
    /// `generator` is only consulted when the options ask for real generation;
    /// a missing generator in that mode counts as a missing credential. Any
    /// generation-path failure is replaced by sample content and recorded as
    /// a fallback notice.
    pub async fn run(
        &self,
        options: &GenerationOptions,
        generator: Option<&dyn QuizGenerator>,
        progress: &dyn ProgressSink,
    ) -> WorkflowState {
        let subject = options.subject;
        let mut state = WorkflowState {
            subject,
            question_count: options.question_count,
            ..WorkflowState::default()
        };
        log::info!(
            "Starting workflow for {} ({} questions, generation: {})",
            subject,
            options.question_count,
            options.use_generation
        );

        for step in Step::ALL {
            state.progress = step.percent();
            state.status = step.status(subject);
            progress
                .report(&ProgressUpdate {
                    percent: state.progress,
                    status: state.status.clone(),
                })
                .await;

            if step == Step::Generating {
                let (quiz, origin) = self.produce_quiz(options, generator, &mut state).await;
                state.quiz = Some(quiz);
                state.origin = Some(origin);
                if let Some(notice) = &state.fallback_notice {
                    progress
                        .report(&ProgressUpdate {
                            percent: state.progress,
                            status: notice.clone(),
                        })
                        .await;
                }
            }

            self.pacing
                .pause(step.pause(!options.use_generation))
                .await;
        }

        state.generated = true;
        state.completed_on = Some(chrono::Local::now().date_naive());
        state.status = format!(
            "Complete! Page created with {} questions",
            state.displayed_questions()
        );
        progress
            .report(&ProgressUpdate {
                percent: state.progress,
                status: state.status.clone(),
            })
            .await;
        log::info!("Workflow for {} finished: {}", subject, state.status);

        state
    }

    async fn produce_quiz(
        &self,
        options: &GenerationOptions,
        generator: Option<&dyn QuizGenerator>,
        state: &mut WorkflowState,
    ) -> (Quiz, QuizOrigin) {
        if !options.use_generation {
            return (self.samples.lookup(options.subject).clone(), QuizOrigin::Sample);
        }

        match generate_quiz(options, generator).await {
            Ok(quiz) => (quiz, QuizOrigin::Generated),
            Err(err) => {
                log::warn!("Quiz generation failed, using sample data: {}", err);
                state.fallback_notice = Some(format!("Falling back to sample data ({})", err));
                (self.samples.lookup(options.subject).clone(), QuizOrigin::Sample)
            }
        }
    }
}

async fn generate_quiz(
    options: &GenerationOptions,
    generator: Option<&dyn QuizGenerator>,
) -> Result<Quiz, QuizSourceError> {
    let generator = generator.ok_or(GenerationError::MissingCredential)?;
    let prompt = build_quiz_prompt(options.subject, options.question_count);
    let raw = generator.generate(&prompt).await?;
    let value = extract_json(&raw)?;
    Ok(Quiz::from_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        updates: Mutex<Vec<ProgressUpdate>>,
    }

    impl RecordingSink {
        fn percents(&self) -> Vec<u8> {
            self.updates.lock().unwrap().iter().map(|u| u.percent).collect()
        }

        fn statuses(&self) -> Vec<String> {
            self.updates
                .lock()
                .unwrap()
                .iter()
                .map(|u| u.status.clone())
                .collect()
        }
    }

    #[async_trait]
    impl ProgressSink for RecordingSink {
        async fn report(&self, update: &ProgressUpdate) {
            self.updates.lock().unwrap().push(update.clone());
        }
    }

    struct FailingGenerator;

    #[async_trait]
    impl QuizGenerator for FailingGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
            Err(GenerationError::Service("quota exceeded".to_string()))
        }
    }

    struct CannedGenerator(&'static str);

    #[async_trait]
    impl QuizGenerator for CannedGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
            Ok(self.0.to_string())
        }
    }

    const GENERATED: &str = r#"Sure! Here is your quiz:
```json
{
  "title": "Stars and Planets",
  "questions": [
    {"question": "Closest star to Earth?", "options": ["Sirius", "The Sun", "Vega", "Rigel"], "answer": 1},
    {"question": "Largest planet?", "options": ["Saturn", "Neptune", "Jupiter", "Earth"], "answer": 2},
    {"question": "Planet with a day longer than its year?", "options": ["Venus", "Mars", "Mercury", "Uranus"], "answer": 0},
    {"question": "What is a light-year?", "options": ["Time", "Speed", "Mass", "Distance"], "answer": 3}
  ]
}
```
Good luck!"#;

    async fn run(
        options: GenerationOptions,
        generator: Option<&dyn QuizGenerator>,
    ) -> (WorkflowState, RecordingSink) {
        let samples = SampleQuizzes::builtin();
        let sink = RecordingSink::default();
        let state = Workflow::new(&samples, Pacing::new(0.0))
            .run(&options, generator, &sink)
            .await;
        (state, sink)
    }

    #[tokio::test]
    async fn sample_mode_completes_with_sample_quiz() {
        let (state, sink) = run(GenerationOptions::new(Subject::Science, 5, false), None).await;

        assert!(state.generated);
        assert_eq!(state.progress, 100);
        assert_eq!(state.quiz.as_ref().unwrap().title, "Science Knowledge Quiz");
        assert_eq!(state.origin, Some(QuizOrigin::Sample));
        assert!(state.fallback_notice.is_none());
        assert!(state.completed_on.is_some());
        assert_eq!(state.status, "Complete! Page created with 5 questions");
        assert_eq!(sink.percents(), vec![10, 30, 50, 70, 85, 100, 100]);
    }

    #[tokio::test]
    async fn service_error_falls_back_to_samples() {
        let generator = FailingGenerator;
        let (state, sink) = run(
            GenerationOptions::new(Subject::History, 5, true),
            Some(&generator),
        )
        .await;

        let samples = SampleQuizzes::builtin();
        assert!(state.generated);
        assert_eq!(state.progress, 100);
        assert_eq!(state.quiz.as_ref(), Some(samples.lookup(Subject::History)));
        assert_eq!(state.origin, Some(QuizOrigin::Sample));
        let notice = state.fallback_notice.unwrap();
        assert!(notice.contains("quota exceeded"));
        assert!(sink.statuses().contains(&notice));
    }

    #[tokio::test]
    async fn missing_generator_in_real_mode_is_missing_credential() {
        let (state, _) = run(GenerationOptions::new(Subject::Literature, 3, true), None).await;

        assert!(state.generated);
        assert_eq!(state.quiz.unwrap().title, "Literature Knowledge Quiz");
        assert!(state.fallback_notice.unwrap().contains("no API key"));
    }

    #[tokio::test]
    async fn generated_quiz_is_used_when_valid() {
        let generator = CannedGenerator(GENERATED);
        let (state, _) = run(
            GenerationOptions::new(Subject::Science, 3, true),
            Some(&generator),
        )
        .await;

        let quiz = state.quiz.as_ref().unwrap();
        assert_eq!(quiz.title, "Stars and Planets");
        assert_eq!(quiz.questions.len(), 4);
        assert_eq!(state.origin, Some(QuizOrigin::Generated));
        assert!(state.fallback_notice.is_none());
        assert_eq!(state.displayed_questions(), 3);
    }

    #[tokio::test]
    async fn malformed_or_invalid_output_falls_back() {
        for raw in [
            "I cannot help with that.",
            "{not json}",
            r#"{"title": "T", "questions": [{"question": "Q", "options": ["a", "b"], "answer": 0}]}"#,
        ] {
            let generator = CannedGenerator(raw);
            let (state, _) = run(
                GenerationOptions::new(Subject::Geography, 5, true),
                Some(&generator),
            )
            .await;

            assert!(state.generated);
            assert_eq!(state.origin, Some(QuizOrigin::Sample));
            assert_eq!(state.quiz.unwrap().title, "Geography Knowledge Quiz");
            assert!(state.fallback_notice.is_some());
        }
    }

    #[tokio::test]
    async fn generator_is_ignored_in_sample_mode() {
        let generator = FailingGenerator;
        let (state, _) = run(
            GenerationOptions::new(Subject::Mathematics, 4, false),
            Some(&generator),
        )
        .await;

        assert!(state.fallback_notice.is_none());
        assert_eq!(state.origin, Some(QuizOrigin::Sample));
    }

    #[test]
    fn question_count_is_clamped() {
        assert_eq!(GenerationOptions::new(Subject::History, 1, false).question_count, 3);
        assert_eq!(GenerationOptions::new(Subject::History, 42, false).question_count, 10);
    }

    #[test]
    fn pacing_scale_is_clamped() {
        assert_eq!(Pacing::new(1e20).scale, MAX_PACING_SCALE);
        assert_eq!(Pacing::new(f64::INFINITY).scale, MAX_PACING_SCALE);
        assert_eq!(Pacing::new(-3.0).scale, 0.0);
        assert_eq!(Pacing::new(f64::NAN).scale, 0.0);
        let longest = Duration::from_millis(1000).mul_f64(Pacing::new(1e20).scale);
        assert_eq!(longest, Duration::from_secs(10));
    }

    #[test]
    fn steps_progress_monotonically() {
        let percents: Vec<u8> = Step::ALL.iter().map(Step::percent).collect();
        assert!(percents.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(percents.last(), Some(&100));
    }
}
