//! Pure `Feature -> AgentSpec` transform (spec §4.9, component C9). Takes
//! no collaborators and touches no I/O — same shape as the teacher's
//! offline config-compilation helpers (`domain/config/agents.rs`), just
//! applied to a feature record instead of a TOML file.

use ab_domain::validate::{MAX_MAX_TURNS, MAX_TIMEOUT_SECONDS, MIN_MAX_TURNS, MIN_TIMEOUT_SECONDS};
use ab_domain::{AcceptanceSpec, AgentSpec, GateMode, TaskType, ToolPolicy, ValidatorSpec};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

/// Source record a planner or feature tracker hands to derivation. Kept
/// deliberately small — everything a caller's feature-tracking system is
/// expected to already have on hand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feature {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: Option<String>,
    pub steps: Vec<String>,
    pub priority: i32,
}

const STANDARD_FORBIDDEN_PATTERNS: &[&str] = &[
    r"rm\s+-rf",
    r"drop\s+table",
    r"chmod\s+777",
    r"/dev/",
];

/// Compiles a `Feature` into an `AgentSpec` ready for `ab-domain::validate_spec`.
/// `allowed_directories` is left empty — derivation has no notion of a
/// project root; the caller populates it once it knows where the run will
/// execute (DESIGN.md Open Question resolution).
pub fn derive(feature: &Feature) -> AgentSpec {
    let task_type = infer_task_type(feature.category.as_deref(), &feature.description);
    let (max_turns, timeout_seconds) = budget_for(task_type, &feature.description, feature.steps.len());

    AgentSpec {
        id: Uuid::new_v4(),
        name: spec_name(&feature.id, &feature.name),
        display_name: display_name(&feature.description),
        objective: feature.description.clone(),
        task_type,
        tool_policy: tool_policy_for(task_type),
        max_turns,
        timeout_seconds,
        acceptance_spec: acceptance_spec_for(feature),
        context: json!({ "source_feature_id": feature.id, "source_type": "feature_derivation" }),
        tags: vec![],
        priority: feature.priority,
        source_feature_id: Some(feature.id.clone()),
    }
}

/// `feature-<slug(id)>-<slug(name)>`, matching the `^[a-z0-9]+(-[a-z0-9]+)*$`
/// pattern `ab_domain::validate_spec` enforces.
fn spec_name(id: &str, name: &str) -> String {
    format!("feature-{}-{}", slug(id), slug(name))
}

/// Lowercases, collapses every run of non-alphanumeric characters to a
/// single hyphen, and trims leading/trailing hyphens.
fn slug(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut last_was_hyphen = false;
    for ch in input.to_lowercase().chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch);
            last_was_hyphen = false;
        } else if !last_was_hyphen {
            out.push('-');
            last_was_hyphen = true;
        }
    }
    out.trim_matches('-').to_string()
}

const DISPLAY_NAME_MAX_CHARS: usize = 100;

/// First sentence of `description` (delimited by `. ! ? \n`), truncated to
/// `DISPLAY_NAME_MAX_CHARS` with an ellipsis.
fn display_name(description: &str) -> String {
    let end = description
        .find(['.', '!', '?', '\n'])
        .unwrap_or(description.len());
    let sentence = description[..end].trim();
    if sentence.chars().count() <= DISPLAY_NAME_MAX_CHARS {
        sentence.to_string()
    } else {
        let head: String = sentence.chars().take(DISPLAY_NAME_MAX_CHARS).collect();
        format!("{head}…")
    }
}

/// Category prefix mapping first, falling back to keyword scoring over the
/// description when no category is given (spec §4.9).
fn infer_task_type(category: Option<&str>, description: &str) -> TaskType {
    if let Some(category) = category {
        let lower = category.to_lowercase();
        if category.starts_with("B.") || lower.contains("testing") {
            return TaskType::Testing;
        }
        if category.starts_with("C.") || lower.contains("documentation") {
            return TaskType::Documentation;
        }
        if ["audit", "security", "review"].iter().any(|k| lower.contains(k)) {
            return TaskType::Audit;
        }
        return TaskType::Coding;
    }
    keyword_score_task_type(description)
}

/// Declared priority order used to break ties between equally-scored task
/// types (spec §4.9 "on tie use a declared priority order").
const TASK_TYPE_PRIORITY: &[(TaskType, &[&str])] = &[
    (TaskType::Coding, &["implement", "create", "build", "add feature"]),
    (TaskType::Testing, &["test", "verify", "check", "validate"]),
    (TaskType::Refactoring, &["refactor", "clean up", "optimize", "simplify"]),
    (TaskType::Documentation, &["document", "readme", "comments"]),
    (TaskType::Audit, &["review", "security", "vulnerability"]),
];

fn keyword_score_task_type(description: &str) -> TaskType {
    let lower = description.to_lowercase();
    let mut best: Option<(TaskType, usize)> = None;
    for (task_type, keywords) in TASK_TYPE_PRIORITY {
        let score = keywords.iter().filter(|k| lower.contains(*k)).count();
        if score > 0 && best.map(|(_, best_score)| score > best_score).unwrap_or(true) {
            best = Some((*task_type, score));
        }
    }
    best.map(|(t, _)| t).unwrap_or(TaskType::Custom)
}

/// Per-task-type tool allow/deny sets (spec §4.9), merged with the standard
/// destructive-pattern list every spec carries regardless of task type.
fn tool_policy_for(task_type: TaskType) -> ToolPolicy {
    let (allowed_tools, forbidden_tools): (Vec<&str>, Vec<&str>) = match task_type {
        TaskType::Coding => (vec!["Read", "Write", "Edit", "Bash", "feature.search", "feature.update"], vec![]),
        TaskType::Testing => (vec!["Read", "Bash"], vec!["Write", "Edit"]),
        TaskType::Refactoring => (vec!["Read", "Write", "Edit", "Bash"], vec![]),
        TaskType::Documentation => (vec!["Read", "Write"], vec!["Bash"]),
        TaskType::Audit => (vec!["Read"], vec!["Write", "Edit", "Bash"]),
        TaskType::Custom => (vec![], vec![]),
    };

    ToolPolicy {
        version: "v1".to_string(),
        allowed_tools: allowed_tools.into_iter().map(String::from).collect(),
        forbidden_tools: forbidden_tools.into_iter().map(String::from).collect(),
        forbidden_patterns: STANDARD_FORBIDDEN_PATTERNS.iter().map(|s| s.to_string()).collect(),
        allowed_directories: vec![],
        tool_hints: Default::default(),
    }
}

fn base_budget(task_type: TaskType) -> (u32, u64) {
    match task_type {
        TaskType::Coding => (50, 1800),
        TaskType::Testing => (30, 600),
        TaskType::Refactoring => (40, 1200),
        TaskType::Documentation => (20, 600),
        TaskType::Audit => (30, 900),
        TaskType::Custom => (25, 900),
    }
}

/// Bounded multipliers applied on top of the task type's base budget,
/// scaling with description length and step count, then clamped to the
/// declared `[MIN, MAX]` range (spec §4.9).
fn budget_for(task_type: TaskType, description: &str, step_count: usize) -> (u32, u64) {
    let (base_turns, base_timeout) = base_budget(task_type);
    let length_multiplier = 1.0 + (description.chars().count() as f64 / 1000.0).min(0.5);
    let step_multiplier = 1.0 + (step_count as f64 * 0.05).min(0.5);
    let scale = length_multiplier * step_multiplier;

    let turns = ((base_turns as f64 * scale).round() as u32).clamp(MIN_MAX_TURNS, MAX_MAX_TURNS);
    let timeout = ((base_timeout as f64 * scale).round() as u64).clamp(MIN_TIMEOUT_SECONDS, MAX_TIMEOUT_SECONDS);
    (turns, timeout)
}

fn acceptance_spec_for(feature: &Feature) -> AcceptanceSpec {
    let mut validators: Vec<ValidatorSpec> = feature
        .steps
        .iter()
        .filter_map(|step| validator_for_step(step))
        .collect();

    validators.push(ValidatorSpec {
        validator_type: "feature_passing".to_string(),
        config: json!({ "feature_id": feature.id }),
        required: true,
        weight: 1.0,
    });

    AcceptanceSpec { validators, gate_mode: GateMode::AllPass }
}

/// Infers a validator from one step's free text (spec §4.9). A step that
/// matches none of the three rules contributes no per-step validator —
/// the terminal `feature_passing` check still covers it.
fn validator_for_step(step: &str) -> Option<ValidatorSpec> {
    let lower = step.to_lowercase();
    if lower.contains("run") || lower.contains("execute") {
        return Some(ValidatorSpec {
            validator_type: "test_pass".to_string(),
            config: json!({ "command": step, "timeout": 120 }),
            required: true,
            weight: 1.0,
        });
    }
    if let Some(path) = mentioned_path(step) {
        return Some(ValidatorSpec {
            validator_type: "file_exists".to_string(),
            config: json!({ "path": path, "should_exist": true }),
            required: true,
            weight: 1.0,
        });
    }
    if lower.contains("should not") || lower.contains("must not") {
        return Some(ValidatorSpec {
            validator_type: "forbidden_patterns".to_string(),
            config: json!({ "patterns": [step] }),
            required: true,
            weight: 1.0,
        });
    }
    None
}

const KNOWN_EXTENSIONS: &[&str] = &[
    ".rs", ".py", ".ts", ".tsx", ".js", ".jsx", ".go", ".md", ".json", ".toml", ".yaml", ".yml",
];

/// Crude token-scan for a path-like mention: a whitespace-delimited token
/// ending in a known file extension, or containing a `/`.
fn mentioned_path(step: &str) -> Option<String> {
    step.split_whitespace()
        .map(|tok| tok.trim_matches(|c: char| !c.is_alphanumeric() && c != '.' && c != '/' && c != '_' && c != '-'))
        .find(|tok| !tok.is_empty() && (tok.contains('/') || KNOWN_EXTENSIONS.iter().any(|ext| tok.ends_with(ext))))
        .map(str::to_string)
}
