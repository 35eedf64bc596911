//! CLI command implementations.

use amity_core::{Config, IndexFailurePolicy, UserId, CONFIG_FILE};
use amity_graph::{GraphEdge, GraphStats, MemoryGraphStore, SledIndex, SnapshotStore};
use amity_relations::{CreateOutcome, DeleteOutcome, FriendLevel, FriendService, RelationOutcome};
use colored::Colorize;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// Sled database directory inside the data directory.
const DB_DIR: &str = "db";

/// An opened data directory.
struct Workspace {
    config: Config,
    snapshot: SnapshotStore,
    store: Arc<MemoryGraphStore>,
    index: Arc<SledIndex>,
    service: FriendService,
}

impl Workspace {
    fn open(data: &Path) -> Result<Self> {
        if !data.join(CONFIG_FILE).exists() {
            return Err(format!(
                "Amity not initialized in {} (run `amity init`)",
                data.display()
            )
            .into());
        }

        let config = Config::load(data)?;
        let snapshot = SnapshotStore::open(data.join(DB_DIR))?;
        let graph = snapshot.load_graph()?.unwrap_or_default();
        let store = Arc::new(MemoryGraphStore::from_graph(graph, config.pool_size));
        let index = Arc::new(snapshot.index()?);
        let service = FriendService::from_config(store.clone(), index.clone(), &config);

        debug!(
            "Opened {} ({} handles, {:?} on index failure)",
            data.display(),
            store.pool_size(),
            config.index_failure
        );
        Ok(Self {
            config,
            snapshot,
            store,
            index,
            service,
        })
    }

    /// Persists the committed graph; the index writes through on its own.
    fn save(&self) -> Result<()> {
        self.store.read(|graph| self.snapshot.save_graph(graph))?;
        self.index.flush()?;
        Ok(())
    }
}

/// Initialize a data directory.
pub fn init(data: &Path, pool_size: Option<usize>, legacy: bool, reset: bool) -> Result<()> {
    let initialized = data.join(CONFIG_FILE).exists();
    if initialized && !reset {
        println!("{} Already initialized", "✓".green());
        return Ok(());
    }

    let mut config = if initialized {
        Config::load(data)?
    } else {
        Config::default()
    };
    if let Some(size) = pool_size {
        config.pool_size = size;
    }
    if legacy {
        config.index_failure = IndexFailurePolicy::Legacy;
    }
    config.save(data)?;

    if reset {
        let snapshot = SnapshotStore::open(data.join(DB_DIR))?;
        snapshot.clear()?;
        snapshot.index()?.clear()?;
        snapshot.flush()?;
        println!("{} Cleared stored graph and index", "✓".green());
    }

    println!("{} Initialized Amity in {}", "✓".green(), data.display());
    println!("  Run {} to add a relation", "amity add-relation".cyan());

    Ok(())
}

/// Add a single user.
pub fn add_user(data: &Path, user: &str) -> Result<()> {
    let ws = Workspace::open(data)?;
    let user = UserId::new(user);

    let outcome = ws.service.add_user(&user);
    ws.save()?;

    match outcome {
        CreateOutcome::Created(id) => {
            println!("{} Added {} as {}", "✓".green(), user.as_str().cyan(), id);
        }
        CreateOutcome::Uncommitted(id) => {
            println!(
                "{} {} got {} but the index write failed; the vertex was not committed",
                "⚠".yellow(),
                user.as_str().cyan(),
                id
            );
        }
        CreateOutcome::AlreadyExists => {
            println!("{} {} already exists", "•".dimmed(), user.as_str().cyan());
        }
        CreateOutcome::Failed(reason) => {
            return Err(format!("could not add {}: {}", user, reason).into());
        }
    }
    Ok(())
}

/// Add a relation, optionally in both directions.
pub fn add_relation(data: &Path, user: &str, friend: &str, mutual: bool) -> Result<()> {
    let ws = Workspace::open(data)?;
    let (user, friend) = (UserId::new(user), UserId::new(friend));

    let mut pairs = vec![(&user, &friend)];
    if mutual {
        pairs.push((&friend, &user));
    }

    let mut gave_up = Vec::new();
    for (from, to) in pairs {
        let outcome = ws.service.add_relation(from, to);
        let arrow = format!("{} -> {}", from, to);
        match outcome {
            RelationOutcome::Applied => println!("{} {}", "✓".green(), arrow.cyan()),
            RelationOutcome::AlreadyApplied => {
                println!("{} {} already exists", "•".dimmed(), arrow.cyan())
            }
            RelationOutcome::Repaired => println!(
                "{} {} {}",
                "✓".green(),
                arrow.cyan(),
                "(repaired stale index)".yellow()
            ),
            RelationOutcome::GaveUp(reason) => gave_up.push(format!("{}: {}", arrow, reason)),
        }
    }
    ws.save()?;

    if !gave_up.is_empty() {
        return Err(format!("could not add {}", gave_up.join("; ")).into());
    }
    Ok(())
}

/// Remove a relation.
pub fn delete_relation(data: &Path, user: &str, friend: &str) -> Result<()> {
    let ws = Workspace::open(data)?;
    let (user, friend) = (UserId::new(user), UserId::new(friend));

    let outcome = ws.service.delete_relation(&user, &friend);
    ws.save()?;

    match outcome {
        DeleteOutcome::Removed(n) => println!(
            "{} Removed {} -> {} ({} edge{})",
            "✓".green(),
            user.as_str().cyan(),
            friend.as_str().cyan(),
            n,
            if n == 1 { "" } else { "s" }
        ),
        DeleteOutcome::NothingToRemove => println!(
            "{} {} does not know {}",
            "•".dimmed(),
            user.as_str().cyan(),
            friend.as_str().cyan()
        ),
        DeleteOutcome::UnknownUser => {
            println!("{} Unknown user {}", "•".dimmed(), user.as_str().cyan())
        }
        DeleteOutcome::GaveUp(reason) => {
            return Err(format!("could not delete {} -> {}: {}", user, friend, reason).into());
        }
    }
    Ok(())
}

/// List direct friends.
pub fn friends(data: &Path, user: &str, json_output: bool) -> Result<()> {
    let ws = Workspace::open(data)?;
    let user = UserId::new(user);

    let mut friends = ws.service.friends(&user)?;
    friends.sort();

    if json_output {
        println!("{}", serde_json::to_string_pretty(&friends)?);
        return Ok(());
    }

    if friends.is_empty() {
        println!("{} knows nobody", user.as_str().cyan());
        return Ok(());
    }
    println!("{} knows {} users:\n", user.as_str().cyan(), friends.len());
    for friend in &friends {
        println!("  {}", friend);
    }
    Ok(())
}

/// Show friend levels of candidates.
pub fn levels(data: &Path, user: &str, candidates: &[String], json_output: bool) -> Result<()> {
    let ws = Workspace::open(data)?;
    let user = UserId::new(user);
    let candidates: Vec<UserId> = candidates.iter().map(UserId::new).collect();

    let levels: BTreeMap<UserId, FriendLevel> = ws
        .service
        .friends_level(&user, &candidates)?
        .into_iter()
        .collect();

    if json_output {
        println!("{}", serde_json::to_string_pretty(&levels)?);
        return Ok(());
    }

    println!("{}", format!("Friend levels for {}", user).cyan().bold());
    println!();
    for candidate in &candidates {
        match levels.get(candidate) {
            Some(FriendLevel::Direct) => {
                println!("  {} {}", "1".green().bold(), candidate)
            }
            Some(FriendLevel::SecondDegree) => {
                println!("  {} {}", "2".yellow().bold(), candidate)
            }
            None => println!("  {} {}", "-".dimmed(), candidate.as_str().dimmed()),
        }
    }
    Ok(())
}

/// Count common friends with candidates.
pub fn common(data: &Path, user: &str, candidates: &[String], json_output: bool) -> Result<()> {
    let ws = Workspace::open(data)?;
    let user = UserId::new(user);
    let candidates: Vec<UserId> = candidates.iter().map(UserId::new).collect();

    let counts: BTreeMap<UserId, u64> = ws
        .service
        .common_friends_count(&user, &candidates)?
        .into_iter()
        .collect();

    if json_output {
        println!("{}", serde_json::to_string_pretty(&counts)?);
        return Ok(());
    }

    if counts.is_empty() {
        println!("No common friends found for {}", user.as_str().cyan());
        return Ok(());
    }

    println!("{}", format!("Common friends with {}", user).cyan().bold());
    println!();
    let mut ranked: Vec<_> = counts.iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    for (candidate, count) in ranked {
        println!("  {:>4} {}", count.to_string().green(), candidate);
    }
    Ok(())
}

/// Show graph and index statistics.
pub fn status(data: &Path) -> Result<()> {
    if !data.join(CONFIG_FILE).exists() {
        println!("{} Amity not initialized in {}", "✗".red(), data.display());
        println!("  Run {} to initialize", "amity init".cyan());
        return Ok(());
    }

    let ws = Workspace::open(data)?;
    let stats = ws.store.stats();
    let entries = ws.index.entries()?;

    // Entries whose vertex is gone or now belongs to someone else.
    let stale = ws.store.read(|graph| {
        entries
            .iter()
            .filter(|entry| graph.find_by_user_id(&entry.user_id) != Some(entry.vertex_id))
            .count()
    });

    let policy = match ws.config.index_failure {
        IndexFailurePolicy::Rollback => "rollback",
        IndexFailurePolicy::Legacy => "legacy",
    };

    println!("{}", "Amity Status".cyan().bold());
    println!();
    println!("  {} {}", "Users:".dimmed(), stats.vertex_count);
    println!("  {} {}", "Relations:".dimmed(), stats.edge_count);
    println!("  {} {}", "Index entries:".dimmed(), entries.len());
    if stale > 0 {
        println!("  {} {}", "Stale entries:".dimmed(), stale.to_string().yellow());
    }
    println!("  {} {}", "Handles:".dimmed(), ws.store.pool_size());
    println!("  {} {}", "Index failure:".dimmed(), policy);

    Ok(())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportStats {
    vertex_count: usize,
    edge_count: usize,
}

impl From<GraphStats> for ExportStats {
    fn from(stats: GraphStats) -> Self {
        Self {
            vertex_count: stats.vertex_count,
            edge_count: stats.edge_count,
        }
    }
}

#[derive(Serialize)]
struct Export {
    version: String,
    stats: ExportStats,
    users: Vec<UserId>,
    edges: Vec<GraphEdge>,
}

/// Export the graph to JSON.
pub fn export(data: &Path, output: Option<&Path>) -> Result<()> {
    let ws = Workspace::open(data)?;

    let export = ws.store.read(|graph| {
        let mut users: Vec<UserId> = graph.vertices().map(|v| v.user_id.clone()).collect();
        users.sort();
        Export {
            version: ws.config.version.clone(),
            stats: graph.stats().into(),
            users,
            edges: graph.export_edges(),
        }
    });
    let json = serde_json::to_string_pretty(&export)?;

    match output {
        Some(path) => {
            fs::write(path, json)?;
            println!("{} Exported to {}", "✓".green(), path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}
