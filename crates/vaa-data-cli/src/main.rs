use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::{json, Map, Value};
use tracing_subscriber::EnvFilter;
use vaa_data_core::{
    DataObject, DataRoot, DataSession, Entity, EntityType, FilterTargets, Filterable,
    ListFormatOptions, Nomination, NominationRef, QuestionCategoryType, QuestionQuery, RootOptions,
};

const CLI_CONTRACT_VERSION: &str = "cli.v1";

#[derive(Debug, Parser)]
#[command(name = "vaa")]
#[command(about = "Voting advice application data CLI")]
struct Cli {
    /// Ingest document (JSON) to provision.
    #[arg(long, env = "VAA_DATA")]
    data: PathBuf,

    /// Locale used to resolve translated values.
    #[arg(long, env = "VAA_LOCALE")]
    locale: Option<String>,

    /// `tracing` filter directive for stderr logging.
    #[arg(long, env = "VAA_LOG", default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    Summary,
    Questions(QuestionsArgs),
    Nominations(NominationsArgs),
    Answers(EntityArgs),
    Coordinates(EntityArgs),
}

#[derive(Debug, Args)]
struct QuestionsArgs {
    #[arg(long)]
    election: String,
    #[arg(long)]
    constituency: Option<String>,
    #[arg(long, value_enum)]
    entity_type: Option<EntityTypeArg>,
    #[arg(long, value_enum)]
    category_type: Option<CategoryTypeArg>,
}

#[derive(Debug, Args)]
struct NominationsArgs {
    #[arg(long)]
    election: String,
    #[arg(long)]
    constituency: String,
    /// Defaults to the election's current round.
    #[arg(long)]
    round: Option<u32>,
}

#[derive(Debug, Args)]
struct EntityArgs {
    #[arg(long, value_enum)]
    entity_type: EntityTypeArg,
    #[arg(long)]
    id: String,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum EntityTypeArg {
    Alliance,
    Candidate,
    Faction,
    Organization,
}

impl From<EntityTypeArg> for EntityType {
    fn from(value: EntityTypeArg) -> Self {
        match value {
            EntityTypeArg::Alliance => Self::Alliance,
            EntityTypeArg::Candidate => Self::Candidate,
            EntityTypeArg::Faction => Self::Faction,
            EntityTypeArg::Organization => Self::Organization,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CategoryTypeArg {
    Default,
    Info,
    Opinion,
}

impl From<CategoryTypeArg> for QuestionCategoryType {
    fn from(value: CategoryTypeArg) -> Self {
        match value {
            CategoryTypeArg::Default => Self::Default,
            CategoryTypeArg::Info => Self::Info,
            CategoryTypeArg::Opinion => Self::Opinion,
        }
    }
}

fn with_contract_version(value: Value) -> Value {
    match value {
        Value::Object(mut object) => {
            object.insert(
                "contract_version".to_string(),
                Value::String(CLI_CONTRACT_VERSION.to_string()),
            );
            Value::Object(object)
        }
        other => json!({
            "contract_version": CLI_CONTRACT_VERSION,
            "payload": other
        }),
    }
}

fn emit_json(value: Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&with_contract_version(value))?);
    Ok(())
}

fn init_tracing(directive: &str) -> Result<()> {
    let filter = EnvFilter::try_new(directive)
        .with_context(|| format!("invalid log level directive `{directive}`"))?;
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
    Ok(())
}

fn load_session(path: &Path, locale: Option<String>) -> Result<DataSession> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read data file {}", path.display()))?;
    let source: Value = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse data file {}", path.display()))?;
    let session = DataSession::new(source, RootOptions { locale })
        .with_context(|| format!("failed to provision data from {}", path.display()))?;
    tracing::debug!(generation = session.generation().get(), "data provisioned");
    Ok(session)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level)?;
    let session = load_session(&cli.data, cli.locale.clone())?;
    let root = session.root();
    match &cli.command {
        Command::Summary => run_summary(root),
        Command::Questions(args) => run_questions(args, root),
        Command::Nominations(args) => run_nominations(args, root),
        Command::Answers(args) => run_answers(args, root),
        Command::Coordinates(args) => run_coordinates(args, root),
    }
}

fn count<T>(items: Option<Vec<T>>) -> Option<usize> {
    items.as_deref().map(<[T]>::len)
}

fn run_summary(root: &DataRoot) -> Result<()> {
    emit_json(json!({
        "generation": root.generation().get(),
        "locale": root.locale(),
        "counts": {
            "elections": count(root.elections()),
            "constituency_groups": count(root.constituency_groups()),
            "constituencies": count(root.constituencies()),
            "question_categories": count(root.question_categories()),
            "questions": count(root.questions()),
            "alliances": count(root.alliances()),
            "candidates": count(root.candidates()),
            "factions": count(root.factions()),
            "organizations": count(root.organizations()),
            "alliance_nominations": count(root.alliance_nominations()),
            "candidate_nominations": count(root.candidate_nominations()),
            "faction_nominations": count(root.faction_nominations()),
            "organization_nominations": count(root.organization_nominations())
        }
    }))
}

fn run_questions(args: &QuestionsArgs, root: &DataRoot) -> Result<()> {
    let election = root.election(&args.election)?;
    let mut targets = FilterTargets::new()
        .with_election(election.id())
        .with_election_round(election.round());
    if let Some(constituency_id) = args.constituency.as_deref() {
        targets = targets.with_constituency(root.constituency(constituency_id)?.id());
    }
    if let Some(entity_type) = args.entity_type {
        targets = targets.with_entity_type(entity_type.into());
    }
    let mut query = QuestionQuery::new().with_targets(targets);
    if let Some(category_type) = args.category_type {
        query = query.with_category_type(category_type.into());
    }
    let questions = root
        .find_questions(&query)
        .into_iter()
        .map(|question| {
            json!({
                "id": question.id(),
                "name": question.name(),
                "type": question.question_type().as_str(),
                "category_id": question.category_id(),
                "matchable": question.is_matchable()
            })
        })
        .collect::<Vec<_>>();
    emit_json(json!({
        "election_id": election.id(),
        "constituency_id": args.constituency,
        "questions": questions
    }))
}

fn describe_nomination(root: &DataRoot, nomination: NominationRef<'_>) -> Result<Value> {
    Ok(json!({
        "id": nomination.id(),
        "entity_id": nomination.entity_id(),
        "name": nomination.display_name(root)?,
        "short_name": nomination.display_short_name(root)?,
        "election_symbol": nomination.election_symbol(),
        "parent_nomination_id": nomination.parent_nomination_id(),
        "generated": nomination.is_generated()
    }))
}

fn run_nominations(args: &NominationsArgs, root: &DataRoot) -> Result<()> {
    let election = root.election(&args.election)?;
    let constituency = root.constituency(&args.constituency)?;
    let round = args.round.unwrap_or_else(|| election.round());
    let mut grouped = Map::new();
    for entity_type in EntityType::ALL {
        let nominations = root
            .nominations_for_constituency(election.id(), constituency.id(), round, entity_type)
            .into_iter()
            .map(|nomination| describe_nomination(root, nomination))
            .collect::<Result<Vec<_>>>()?;
        grouped.insert(entity_type.to_string(), Value::Array(nominations));
    }
    emit_json(json!({
        "election_id": election.id(),
        "constituency_id": constituency.id(),
        "round": round,
        "nominations": grouped
    }))
}

fn run_answers(args: &EntityArgs, root: &DataRoot) -> Result<()> {
    let entity = root.entity(args.entity_type.into(), &args.id)?;
    let options = ListFormatOptions::default();
    let answers = entity
        .answered_questions(root)?
        .into_iter()
        .map(|question| {
            json!({
                "question_id": question.id(),
                "question": question.name(),
                "answer": entity.formatted_answer(root, question, &options),
                "info": entity.raw_answer(question.id()).and_then(|answer| answer.info.as_deref())
            })
        })
        .collect::<Vec<_>>();
    emit_json(json!({
        "entity_type": entity.entity_type().to_string(),
        "entity_id": entity.id(),
        "name": entity.display_name(root),
        "answers": answers
    }))
}

fn run_coordinates(args: &EntityArgs, root: &DataRoot) -> Result<()> {
    let entity_type = EntityType::from(args.entity_type);
    let entity = root.entity(entity_type, &args.id)?;
    let targets = FilterTargets::new().with_entity_type(entity_type);
    let coordinates = root
        .questions()
        .unwrap_or_default()
        .into_iter()
        .filter(|question| question.is_matchable() && question.applies_to(&targets))
        .map(|question| match question.normalize_answer(entity.raw_answer(question.id())) {
            Ok(normalized) => json!({
                "question_id": question.id(),
                "coordinates": normalized.coordinates()
            }),
            Err(err) => {
                tracing::warn!(question = question.id(), error = %err, "answer not normalized");
                json!({ "question_id": question.id(), "error": err.to_string() })
            }
        })
        .collect::<Vec<_>>();
    emit_json(json!({
        "entity_type": entity_type.to_string(),
        "entity_id": entity.id(),
        "coordinates": coordinates
    }))
}
