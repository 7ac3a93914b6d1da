//! Migration registry and runner.

use std::collections::HashSet;
use std::sync::Arc;

use tbio_docs::DocumentStore;
use tracing::{info, warn};

use super::{LedgerEntry, Migration, MigrationLedger, MigrationPreview, MigrationResult};
use crate::ProfileError;

/// Registration options for a migration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrationOptions {
    /// Safe to run against a live site; included in `safe_only` runs.
    pub safe: bool,
}

/// Which migrations a run should consider.
#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    /// Run only this migration instead of every pending one.
    pub only: Option<String>,
    /// Skip migrations not registered as safe.
    pub safe_only: bool,
    /// Preview instead of applying; nothing is recorded.
    pub dry_run: bool,
}

/// What happened to one migration during a run.
#[derive(Debug, Clone)]
pub enum OutcomeKind {
    /// Found in the ledger; not run again.
    AlreadyApplied,
    /// Had nothing to do; recorded without applying.
    NothingToDo,
    Applied(MigrationResult),
    Previewed(MigrationPreview),
}

#[derive(Debug, Clone)]
pub struct MigrationOutcome {
    pub name: &'static str,
    pub kind: OutcomeKind,
}

/// A registered migration and its ledger state.
#[derive(Debug, Clone)]
pub struct MigrationStatus {
    pub name: &'static str,
    pub description: &'static str,
    pub depends_on: &'static [&'static str],
    pub options: MigrationOptions,
    pub applied: Option<LedgerEntry>,
}

struct Registered {
    migration: Arc<dyn Migration>,
    options: MigrationOptions,
}

impl Registered {
    fn name(&self) -> &'static str {
        self.migration.name()
    }
}

/// Records which named migrations have run and runs the rest exactly once,
/// dependencies first.
pub struct MigrationRegistry {
    store: Arc<dyn DocumentStore>,
    ledger: MigrationLedger,
    migrations: Vec<Registered>,
}

impl MigrationRegistry {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            ledger: MigrationLedger::new(Arc::clone(&store)),
            store,
            migrations: Vec::new(),
        }
    }

    /// Register a migration under its own name.
    pub fn register(
        &mut self,
        migration: Arc<dyn Migration>,
        options: MigrationOptions,
    ) -> Result<(), ProfileError> {
        if self.migrations.iter().any(|r| r.name() == migration.name()) {
            return Err(ProfileError::DuplicateMigration(
                migration.name().to_string(),
            ));
        }
        self.migrations.push(Registered { migration, options });
        Ok(())
    }

    /// Registered names, in registration order.
    pub fn names(&self) -> Vec<&'static str> {
        self.migrations.iter().map(Registered::name).collect()
    }

    /// Migrations in an order where every dependency precedes its dependents.
    ///
    /// Among migrations whose dependencies are satisfied, registration order
    /// wins.
    fn ordered(&self) -> Result<Vec<&Registered>, ProfileError> {
        let names: HashSet<&str> = self.migrations.iter().map(Registered::name).collect();
        for r in &self.migrations {
            if let Some(dep) = r.migration.depends_on().iter().find(|d| !names.contains(**d)) {
                return Err(ProfileError::MissingDependency {
                    name: r.name().to_string(),
                    dependency: dep.to_string(),
                });
            }
        }

        let mut placed: HashSet<&str> = HashSet::new();
        let mut ordered = Vec::with_capacity(self.migrations.len());
        while ordered.len() < self.migrations.len() {
            let next = self.migrations.iter().find(|r| {
                !placed.contains(r.name())
                    && r.migration.depends_on().iter().all(|d| placed.contains(d))
            });
            match next {
                Some(r) => {
                    placed.insert(r.name());
                    ordered.push(r);
                }
                None => {
                    let stuck = self
                        .migrations
                        .iter()
                        .find(|r| !placed.contains(r.name()))
                        .map(Registered::name)
                        .unwrap_or_default();
                    return Err(ProfileError::DependencyCycle(stuck.to_string()));
                }
            }
        }
        Ok(ordered)
    }

    /// Every registered migration, dependencies first, with its ledger entry.
    pub async fn status(&self) -> Result<Vec<MigrationStatus>, ProfileError> {
        let mut completed = self.ledger.completed().await?;
        Ok(self
            .ordered()?
            .into_iter()
            .map(|r| MigrationStatus {
                name: r.name(),
                description: r.migration.description(),
                depends_on: r.migration.depends_on(),
                options: r.options,
                applied: completed.remove(r.name()),
            })
            .collect())
    }

    /// Run pending migrations.
    ///
    /// Stops at the first failure; migrations that completed before it stay
    /// recorded, and the failed one can be re-run.
    pub async fn migrate(
        &self,
        request: &RunRequest,
    ) -> Result<Vec<MigrationOutcome>, ProfileError> {
        let ordered = self.ordered()?;
        let mut completed: HashSet<String> =
            self.ledger.completed().await?.into_keys().collect();

        let selected: Vec<&Registered> = match &request.only {
            Some(name) => vec![
                ordered
                    .into_iter()
                    .find(|r| r.name() == name.as_str())
                    .ok_or_else(|| ProfileError::UnknownMigration(name.clone()))?,
            ],
            None => ordered
                .into_iter()
                .filter(|r| !request.safe_only || r.options.safe)
                .collect(),
        };

        let store = self.store.as_ref();
        let mut outcomes = Vec::with_capacity(selected.len());

        for r in selected {
            let name = r.name();
            let failed = |source: ProfileError| ProfileError::MigrationFailed {
                name: name.to_string(),
                source: Box::new(source),
            };

            if completed.contains(name) {
                info!(migration = name, "already applied, skipping");
                outcomes.push(MigrationOutcome {
                    name,
                    kind: OutcomeKind::AlreadyApplied,
                });
                continue;
            }

            if let Some(dep) = r
                .migration
                .depends_on()
                .iter()
                .find(|d| !completed.contains(**d))
            {
                return Err(ProfileError::DependencyPending {
                    name: name.to_string(),
                    dependency: dep.to_string(),
                });
            }

            if request.dry_run {
                let preview = r.migration.preview(store).await.map_err(failed)?;
                info!(
                    migration = name,
                    records = preview.records_to_update,
                    "previewed migration"
                );
                // Dependents are previewed as if this one had run.
                completed.insert(name.to_string());
                outcomes.push(MigrationOutcome {
                    name,
                    kind: OutcomeKind::Previewed(preview),
                });
                continue;
            }

            if !r.migration.needs_migration(store).await.map_err(failed)? {
                self.ledger.record(name, 0).await?;
                info!(migration = name, "nothing to migrate, recorded as applied");
                completed.insert(name.to_string());
                outcomes.push(MigrationOutcome {
                    name,
                    kind: OutcomeKind::NothingToDo,
                });
                continue;
            }

            info!(migration = name, "running migration");
            let result = r.migration.apply(store).await.map_err(failed)?;
            for warning in &result.warnings {
                warn!(migration = name, "{}", warning);
            }
            self.ledger.record(name, result.records_updated).await?;
            info!(
                migration = name,
                records_updated = result.records_updated,
                "migration complete"
            );

            completed.insert(name.to_string());
            outcomes.push(MigrationOutcome {
                name,
                kind: OutcomeKind::Applied(result),
            });
        }

        Ok(outcomes)
    }
}
