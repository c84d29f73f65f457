use std::fmt;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use mastery_core::curriculum::Curriculum;
use mastery_core::learner::LearnerProgress;
use mastery_core::model::{LearnerId, QuizSettings};
use mastery_core::quiz::QuizStep;
use mastery_core::trajectory::Period;
use services::{
    AnalyticsService, Clock, OutlineGenerator, ProgressService, ProgressServiceError,
    StudyGuideOutcome, StudyGuideService,
};
use storage::{InMemoryRepository, Storage};

const BUNDLED_CURRICULUM: &str = include_str!("../curriculum/react.json");
const DEMO_PEER: &str = "demo-peer";

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidQuizSize { raw: String },
    InvalidLearner { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidQuizSize { raw } => write!(f, "invalid --quiz-size value: {raw}"),
            ArgsError::InvalidLearner { raw } => write!(f, "invalid --learner value: {raw:?}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- path [--curriculum <file>] [--learner <id>]");
    eprintln!("  cargo run -p app -- quiz [--curriculum <file>] [--learner <id>] [--quiz-size <n>]");
    eprintln!("  cargo run -p app -- demo [--curriculum <file>] [--learner <id>] [--quiz-size <n>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --curriculum  bundled React curriculum");
    eprintln!("  --learner     student1");
    eprintln!("  --quiz-size   {}", QuizSettings::DEFAULT_QUESTIONS_PER_QUIZ);
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  MASTERY_CURRICULUM, MASTERY_LEARNER, MASTERY_QUIZ_SIZE, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Path,
    Quiz,
    Demo,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "path" => Some(Self::Path),
            "quiz" => Some(Self::Quiz),
            "demo" => Some(Self::Demo),
            _ => None,
        }
    }
}

struct Args {
    curriculum: Option<PathBuf>,
    learner: LearnerId,
    settings: QuizSettings,
}

fn parse_quiz_size(raw: String) -> Result<QuizSettings, ArgsError> {
    raw.trim()
        .parse::<u32>()
        .ok()
        .and_then(|n| QuizSettings::new(n).ok())
        .ok_or(ArgsError::InvalidQuizSize { raw })
}

fn parse_learner(raw: String) -> Result<LearnerId, ArgsError> {
    raw.parse()
        .map_err(|_| ArgsError::InvalidLearner { raw })
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut curriculum = std::env::var("MASTERY_CURRICULUM")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);
        let mut learner = match std::env::var("MASTERY_LEARNER") {
            Ok(value) => parse_learner(value)?,
            Err(_) => LearnerId::new("student1"),
        };
        let mut settings = match std::env::var("MASTERY_QUIZ_SIZE") {
            Ok(value) => parse_quiz_size(value)?,
            Err(_) => QuizSettings::default(),
        };

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--curriculum" => {
                    curriculum = Some(PathBuf::from(require_value(args, "--curriculum")?));
                }
                "--learner" => {
                    learner = parse_learner(require_value(args, "--learner")?)?;
                }
                "--quiz-size" => {
                    settings = parse_quiz_size(require_value(args, "--quiz-size")?)?;
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            curriculum,
            learner,
            settings,
        })
    }
}

fn load_curriculum(path: Option<&PathBuf>) -> Result<Curriculum, Box<dyn std::error::Error>> {
    let curriculum = match path {
        Some(path) => Curriculum::from_json(&std::fs::read_to_string(path)?)?,
        None => Curriculum::from_json(BUNDLED_CURRICULUM)?,
    };
    if !curriculum.rejected.is_empty() {
        tracing::warn!(
            rejected = curriculum.rejected.len(),
            "curriculum contains malformed questions"
        );
    }
    Ok(curriculum)
}

fn print_path(service: &ProgressService, learner: &LearnerProgress) {
    println!("Learning path for {}:", learner.learner_id());
    for entry in learner.learning_path(service.graph()) {
        println!(
            "  [{:<9}] {:>4}  {}",
            format!("{:?}", entry.status).to_lowercase(),
            entry.mastery.to_string(),
            entry.topic.name
        );
    }
}

/// Run one quiz on the current topic, reading answers line by line from stdin.
async fn run_interactive_quiz(
    service: &ProgressService,
    learner: &mut LearnerProgress,
) -> Result<(), Box<dyn std::error::Error>> {
    let session = service.start_quiz(learner).await?;
    println!("Quiz: {} question(s)", session.total_questions());

    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        let Some(question) = learner.active_quiz().and_then(|s| s.current_question()) else {
            break;
        };
        println!();
        println!("{}", question.text());
        if let Some(options) = question.options() {
            for option in options {
                println!("  - {option}");
            }
        }
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next().transpose()? else {
            service.abandon_quiz(learner);
            println!();
            println!("Quiz abandoned; nothing was recorded.");
            return Ok(());
        };

        let feedback = service.answer_current(learner, &line)?;
        if feedback.is_correct {
            println!("Correct.");
        } else {
            println!("Incorrect. Expected: {}", feedback.correct_answer);
        }
        if !feedback.explanation.is_empty() {
            println!("  {}", feedback.explanation);
        }

        if let QuizStep::Complete(outcome) = service.advance(learner).await?.step {
            println!();
            println!(
                "Scored {}/{} ({}); mastery now {}.",
                outcome.correct, outcome.total, outcome.raw_percent, outcome.final_mastery
            );
        }
    }
    Ok(())
}

/// Answer every question of every reachable topic correctly.
async fn run_scripted_mastery(
    service: &ProgressService,
    learner: &mut LearnerProgress,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        match service.start_quiz(learner).await {
            Ok(_) => {}
            Err(ProgressServiceError::NothingToStudy) => return Ok(()),
            Err(err) => return Err(err.into()),
        }
        while let Some(answer) = learner
            .active_quiz()
            .and_then(|s| s.current_question())
            .map(|q| q.correct_answer().to_owned())
        {
            service.answer_current(learner, &answer)?;
            service.advance(learner).await?;
        }
    }
}

/// Take a single quiz answering everything wrong.
async fn run_scripted_failure(
    service: &ProgressService,
    learner: &mut LearnerProgress,
) -> Result<(), Box<dyn std::error::Error>> {
    service.start_quiz(learner).await?;
    while learner.active_quiz().is_some() {
        service.answer_current(learner, "I don't know")?;
        service.advance(learner).await?;
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);

    let cmd = match argv.next() {
        None => {
            print_usage();
            return Ok(());
        }
        Some(first) if first == "--help" || first == "-h" => {
            print_usage();
            return Ok(());
        }
        Some(first) => Command::from_arg(&first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    let parsed = Args::parse(&mut argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let curriculum = load_curriculum(parsed.curriculum.as_ref())?;
    let graph = Arc::new(curriculum.graph);
    let storage = Storage::from_repository(InMemoryRepository::with_questions(
        curriculum.questions,
    ));

    let progress = ProgressService::new(
        Clock::default(),
        Arc::clone(&graph),
        Arc::clone(&storage.questions),
        Arc::clone(&storage.progress),
    )
    .with_settings(parsed.settings);
    let analytics = AnalyticsService::new(Arc::clone(&graph), Arc::clone(&storage.progress));

    let mut learner = progress.load_learner(&parsed.learner).await?;

    match cmd {
        Command::Path => {
            print_path(&progress, &learner);
        }
        Command::Quiz => {
            print_path(&progress, &learner);
            println!();
            run_interactive_quiz(&progress, &mut learner).await?;
            println!();
            print_path(&progress, &learner);
        }
        Command::Demo => {
            run_scripted_mastery(&progress, &mut learner).await?;
            let mut peer = progress.load_learner(&LearnerId::new(DEMO_PEER)).await?;
            run_scripted_failure(&progress, &mut peer).await?;

            print_path(&progress, &learner);
            println!();
            println!("Learner report:");
            println!(
                "{}",
                serde_json::to_string_pretty(&analytics.report_for(&learner))?
            );
            println!();
            println!("Cohort report:");
            println!(
                "{}",
                serde_json::to_string_pretty(&analytics.cohort_report().await?)?
            );
            println!();
            println!("Weekly trajectory:");
            println!(
                "{}",
                serde_json::to_string_pretty(&analytics.trajectory(Period::Week).await?)?
            );

            let guides = StudyGuideService::new(analytics, Arc::new(OutlineGenerator));
            println!();
            match guides.for_student(DEMO_PEER).await? {
                StudyGuideOutcome::Guide(guide) => println!("{}", guide.study_guide),
                StudyGuideOutcome::NothingToReview => {
                    println!("{DEMO_PEER} has no weak topics.");
                }
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
