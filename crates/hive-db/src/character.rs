//! Character data source: profiles, survivors, and the audit log.
//!
//! A profile is created on a player's first login and never deleted. A
//! survivor (character) belongs to one profile and one world; at most one
//! living survivor exists per (profile, world), enforced by the
//! `survivor_one_living` partial unique index and by filtering every lookup
//! on `NOT is_dead`. Death is a soft delete that first rolls the
//! survivor's counters into the profile's lifetime totals.

use std::collections::BTreeMap;
use std::sync::Arc;

use hive_sqf::Value;

use crate::config::CharacterConfig;
use crate::database::{Database, Row, SqlParam};
use crate::error::DataSourceError;
use crate::response::{
    CharacterDetails, DetailsResponse, KillStats, LoginResponse, SurvivalTimers,
};
use crate::source::{SqlDataSource, parse_or_default};

/// Field updates keyed by field name, as sent by the game.
pub type CharacterFields = BTreeMap<String, Value>;

/// Medical state written for a freshly created character.
const NEW_CHARACTER_MEDICAL: &str = "[false,false,false,false,false,false,false,12000,[],[0,0],0]";

/// Humanity reported when the profile has none stored.
const DEFAULT_HUMANITY: i32 = 2500;

/// Named log codes for the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogCode {
    /// Player joined the instance.
    Login,
    /// Player left the instance.
    Disconnect,
}

impl LogCode {
    /// Map a game action code. Codes other than 0 and 2 have no log code.
    pub const fn from_action(action: i32) -> Option<Self> {
        match action {
            0 => Some(Self::Login),
            2 => Some(Self::Disconnect),
            _ => None,
        }
    }

    /// Name stored in the `log_code` table.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Login => "Login",
            Self::Disconnect => "Disconnect",
        }
    }
}

/// Right-hand side of one `SET` assignment.
#[derive(Debug, Clone, PartialEq)]
enum Assignment {
    Text(String),
    Now,
    Delta(i32),
}

/// The statement an `update_character` call boils down to.
#[derive(Debug, Default, Clone, PartialEq)]
struct UpdatePlan {
    survivor: Vec<(String, Assignment)>,
    humanity: Option<i32>,
}

impl UpdatePlan {
    fn build(character_id: i32, fields: &CharacterFields, worldspace_column: &str) -> Self {
        let mut plan = Self::default();
        for (name, value) in fields {
            match name.as_str() {
                "worldspace" | "inventory" | "backpack" | "medical" | "state" => {
                    if value.as_array().is_err() {
                        warn_kind(character_id, name, value, "array");
                        continue;
                    }
                    let column = if name == "worldspace" {
                        worldspace_column
                    } else {
                        name
                    };
                    plan.survivor
                        .push((column.to_owned(), Assignment::Text(value.to_string())));
                }
                "just_ate" | "just_drank" => match value.as_bool() {
                    Ok(true) => {
                        let column = if name == "just_ate" { "last_ate" } else { "last_drank" };
                        plan.survivor.push((column.to_owned(), Assignment::Now));
                    }
                    Ok(false) => {}
                    Err(_) => warn_kind(character_id, name, value, "bool"),
                },
                "zombie_kills" | "headshots" | "DistanceFoot" | "survival_time"
                | "survivor_kills" | "bandit_kills" | "humanity" => {
                    let Some(delta) = value.as_double().ok().and_then(truncate_delta) else {
                        warn_kind(character_id, name, value, "number");
                        continue;
                    };
                    match (name.as_str(), delta) {
                        (_, 0) => {}
                        ("humanity", _) => plan.humanity = Some(delta),
                        ("DistanceFoot", _) => plan
                            .survivor
                            .push(("distance_foot".to_owned(), Assignment::Delta(delta))),
                        _ => plan.survivor.push((name.clone(), Assignment::Delta(delta))),
                    }
                }
                "model" => match value.as_str() {
                    Ok(model) => plan
                        .survivor
                        .push(("model".to_owned(), Assignment::Text(model.to_owned()))),
                    Err(_) => warn_kind(character_id, name, value, "string"),
                },
                _ => tracing::debug!(character_id, field = %name, "Ignoring unknown character field"),
            }
        }
        plan
    }

    const fn is_empty(&self) -> bool {
        self.survivor.is_empty() && self.humanity.is_none()
    }

    /// Render the statement. `$1` is always the character id.
    fn to_sql(&self, quote: impl Fn(&str) -> String) -> (String, Vec<SqlParam>) {
        let mut params = Vec::new();
        let mut next_param = |param: SqlParam| {
            params.push(param);
            params.len().saturating_add(1)
        };

        let humanity_sql = self.humanity.map(|delta| {
            let n = next_param(SqlParam::Int32(delta));
            format!(
                "UPDATE profile p SET humanity = p.humanity + ${n} \
                 FROM survivor s WHERE s.unique_id = p.unique_id AND s.id = $1"
            )
        });

        let set_clause = self
            .survivor
            .iter()
            .map(|(column, assignment)| {
                let column = quote(column);
                match assignment {
                    Assignment::Text(text) => {
                        let n = next_param(SqlParam::text(text.as_str()));
                        format!("{column} = ${n}")
                    }
                    Assignment::Now => format!("{column} = NOW()"),
                    Assignment::Delta(delta) => {
                        let n = next_param(SqlParam::Int32(*delta));
                        format!("{column} = s.{column} + ${n}")
                    }
                }
            })
            .collect::<Vec<_>>()
            .join(", ");

        let sql = match (humanity_sql, set_clause.is_empty()) {
            (Some(humanity), true) => humanity,
            (Some(humanity), false) => format!(
                "WITH humanity_update AS ({humanity}) UPDATE survivor s SET {set_clause} WHERE s.id = $1"
            ),
            (None, _) => format!("UPDATE survivor s SET {set_clause} WHERE s.id = $1"),
        };
        (sql, params)
    }
}

fn warn_kind(character_id: i32, field: &str, value: &Value, expected: &'static str) {
    tracing::warn!(
        character_id,
        field,
        expected,
        found = %value.kind(),
        value = %value,
        "Ignoring character field of the wrong kind"
    );
}

/// Truncate toward zero, rejecting values outside the `i32` range.
#[allow(clippy::cast_possible_truncation)]
fn truncate_delta(value: f64) -> Option<i32> {
    let truncated = value.trunc();
    (truncated >= f64::from(i32::MIN) && truncated <= f64::from(i32::MAX))
        .then_some(truncated as i32)
}

/// Unwrap a model stored as an SQF string; anything else is used verbatim.
fn parse_model(raw: Option<&str>) -> String {
    let raw = raw.unwrap_or_default();
    match hive_sqf::parse(raw) {
        Ok(Value::String(model)) => model,
        _ => raw.to_owned(),
    }
}

/// Player and character persistence.
#[derive(Debug)]
pub struct CharacterDataSource<D> {
    source: SqlDataSource<D>,
    worldspace_column: String,
}

impl<D: Database> CharacterDataSource<D> {
    /// Create the data source over `db`.
    pub fn new(db: Arc<D>, config: &CharacterConfig, strict: bool) -> Self {
        Self {
            source: SqlDataSource::new(db, strict),
            worldspace_column: config.worldspace_column.clone(),
        }
    }

    /// Shared plumbing, for inspection.
    pub const fn source(&self) -> &SqlDataSource<D> {
        &self.source
    }

    /// Log a player in and return their living character, creating the
    /// profile and the character as needed.
    ///
    /// A failed character insert or a miss when reading the new id back
    /// yields [`LoginResponse::Error`]. A failed insert is only an `Err`
    /// when strict writes are enabled.
    pub async fn login_player(
        &self,
        player_id: &str,
        server_id: i32,
        player_name: &str,
    ) -> Result<LoginResponse, DataSourceError> {
        let new_player = self.ensure_profile(player_id, player_name).await?;

        let ws = self.source.ident(&self.worldspace_column);
        let living = self
            .source
            .fetch(
                "find_character",
                &format!(
                    "SELECT s.id, s.{ws}, s.inventory, s.backpack, \
                     FLOOR(EXTRACT(EPOCH FROM (s.last_updated - s.start_time)) / 60)::INT, \
                     FLOOR(EXTRACT(EPOCH FROM (NOW() - s.last_ate)) / 60)::INT, \
                     FLOOR(EXTRACT(EPOCH FROM (NOW() - s.last_drank)) / 60)::INT, \
                     s.model \
                     FROM survivor s JOIN instance i ON s.world_id = i.world_id AND i.id = $1 \
                     WHERE s.unique_id = $2 AND NOT s.is_dead"
                ),
                &[SqlParam::Int32(server_id), SqlParam::text(player_id)],
            )
            .await?;

        if let Some(row) = living.first() {
            return self.existing_character(new_player, row).await;
        }
        self.create_character(new_player, player_id, server_id, player_name)
            .await
    }

    /// Returns whether the profile was created by this call.
    async fn ensure_profile(&self, player_id: &str, player_name: &str) -> Result<bool, DataSourceError> {
        let rows = self
            .source
            .fetch(
                "find_profile",
                "SELECT name FROM profile WHERE unique_id = $1",
                &[SqlParam::text(player_id)],
            )
            .await?;

        if let Some(row) = rows.first() {
            let stored = row.field(0).text();
            if stored != player_name {
                self.source
                    .write(
                        "rename_profile",
                        || "UPDATE profile SET name = $1 WHERE unique_id = $2".to_owned(),
                        vec![SqlParam::text(player_name), SqlParam::text(player_id)],
                    )
                    .await?;
                tracing::info!(player_id, from = stored, to = player_name, "Changed player name");
            }
            return Ok(false);
        }

        let inserted = self
            .source
            .write_sync(
                "insert_profile",
                || {
                    "INSERT INTO profile (unique_id, name) VALUES ($1, $2) \
                     ON CONFLICT (unique_id) DO NOTHING"
                        .to_owned()
                },
                vec![SqlParam::text(player_id), SqlParam::text(player_name)],
            )
            .await?;
        if inserted == 1 {
            tracing::info!(player_id, name = player_name, "Created a new player");
        }
        Ok(inserted == 1)
    }

    async fn existing_character(&self, new_player: bool, row: &Row) -> Result<LoginResponse, DataSourceError> {
        let Some(character_id) = row.field(0).parse_i32() else {
            tracing::error!(raw = row.field(0).text(), "Living character has an unreadable id");
            return Ok(LoginResponse::Error);
        };
        let record = character_id.to_string();
        let worldspace = parse_or_default(&record, "worldspace", row.field(1).as_str(), Value::empty_array());
        let inventory = parse_or_default(&record, "inventory", row.field(2).as_str(), Value::empty_array());
        let backpack = parse_or_default(&record, "backpack", row.field(3).as_str(), Value::empty_array());
        let survival = SurvivalTimers {
            minutes_alive: row.field(4).get_i32(),
            minutes_since_ate: row.field(5).get_i32(),
            minutes_since_drank: row.field(6).get_i32(),
        };
        let model = parse_model(row.field(7).as_str());

        self.source
            .write(
                "touch_character",
                || "UPDATE survivor SET last_updated = NOW() WHERE id = $1".to_owned(),
                vec![SqlParam::Int32(character_id)],
            )
            .await?;

        Ok(LoginResponse::Existing {
            new_player,
            character_id,
            worldspace,
            inventory,
            backpack,
            survival,
            model,
        })
    }

    async fn create_character(
        &self,
        new_player: bool,
        player_id: &str,
        server_id: i32,
        player_name: &str,
    ) -> Result<LoginResponse, DataSourceError> {
        let ws = self.source.ident(&self.worldspace_column);
        // Synchronous: the id is read back right after.
        let inserted = self
            .source
            .write_sync(
                "insert_character",
                || {
                    format!(
                        "INSERT INTO survivor (unique_id, start_time, world_id, {ws}, inventory, backpack, medical) \
                         SELECT $1, NOW(), i.world_id, $2, i.inventory, i.backpack, $3 FROM instance i WHERE i.id = $4 \
                         ON CONFLICT (unique_id, world_id) WHERE NOT is_dead DO NOTHING"
                    )
                },
                vec![
                    SqlParam::text(player_id),
                    SqlParam::text(Value::empty_array().to_string()),
                    SqlParam::text(NEW_CHARACTER_MEDICAL),
                    SqlParam::Int32(server_id),
                ],
            )
            .await;
        if let Err(e) = inserted {
            if e.is_fatal() {
                return Err(e);
            }
            tracing::error!(player_id, server_id, error = %e, "Error creating character");
            return Ok(LoginResponse::Error);
        }

        let rows = self
            .source
            .fetch(
                "find_new_character",
                "SELECT s.id FROM survivor s JOIN instance i ON s.world_id = i.world_id AND i.id = $1 \
                 WHERE s.unique_id = $2 AND NOT s.is_dead",
                &[SqlParam::Int32(server_id), SqlParam::text(player_id)],
            )
            .await?;
        let Some(row) = rows.first() else {
            tracing::error!(player_id, server_id, "Error fetching created character");
            return Ok(LoginResponse::Error);
        };

        let Some(character_id) = row.field(0).parse_i32() else {
            tracing::error!(player_id, server_id, raw = row.field(0).text(), "Created character has an unreadable id");
            return Ok(LoginResponse::Error);
        };
        tracing::info!(character_id, player_id, name = player_name, "Created a new character");
        Ok(LoginResponse::Created {
            new_player,
            character_id,
            model: String::new(),
        })
    }

    /// Load the state a character needs after login.
    pub async fn fetch_character_details(&self, character_id: i32) -> Result<DetailsResponse, DataSourceError> {
        let ws = self.source.ident(&self.worldspace_column);
        let rows = self
            .source
            .fetch(
                "character_details",
                &format!(
                    "SELECT s.{ws}, s.medical, s.zombie_kills, s.headshots, s.survivor_kills, \
                     s.bandit_kills, s.state, p.humanity \
                     FROM survivor s JOIN profile p ON s.unique_id = p.unique_id WHERE s.id = $1"
                ),
                &[SqlParam::Int32(character_id)],
            )
            .await?;

        let Some(row) = rows.first() else {
            return Ok(DetailsResponse::Error);
        };

        let record = character_id.to_string();
        let humanity = row.field(7);
        Ok(DetailsResponse::Pass(CharacterDetails {
            worldspace: parse_or_default(&record, "worldspace", row.field(0).as_str(), Value::empty_array()),
            medical: parse_or_default(&record, "medical", row.field(1).as_str(), Value::empty_array()),
            stats: KillStats {
                zombie_kills: row.field(2).get_i32(),
                headshots: row.field(3).get_i32(),
                survivor_kills: row.field(4).get_i32(),
                bandit_kills: row.field(5).get_i32(),
            },
            state: parse_or_default(&record, "state", row.field(6).as_str(), Value::empty_array()),
            humanity: if humanity.is_null() {
                DEFAULT_HUMANITY
            } else {
                humanity.get_i32()
            },
        }))
    }

    /// Apply a partial update. Counters are applied as deltas relative to
    /// the stored value; an empty or all-zero update issues no statement.
    pub async fn update_character(
        &self,
        character_id: i32,
        fields: &CharacterFields,
    ) -> Result<(), DataSourceError> {
        let plan = UpdatePlan::build(character_id, fields, &self.worldspace_column);
        if plan.is_empty() {
            return Ok(());
        }
        let (sql, mut params) = plan.to_sql(|name| self.source.ident(name));
        params.insert(0, SqlParam::Int32(character_id));
        self.source.write_adhoc("update_character", sql, params).await
    }

    /// Overwrite inventory and backpack.
    ///
    /// The row is matched on `unique_id` against the character id rendered
    /// as text, so this only hits profiles whose unique id is that number.
    pub async fn init_character(
        &self,
        character_id: i32,
        inventory: &Value,
        backpack: &Value,
    ) -> Result<(), DataSourceError> {
        self.source
            .write(
                "init_character",
                || "UPDATE survivor SET inventory = $1, backpack = $2 WHERE unique_id = $3".to_owned(),
                vec![
                    SqlParam::text(inventory.to_string()),
                    SqlParam::text(backpack.to_string()),
                    SqlParam::text(character_id.to_string()),
                ],
            )
            .await
    }

    /// Roll the character's counters into its profile, then mark it dead.
    ///
    /// The rollup only reads a living survivor, so calling this again for
    /// the same character adds nothing.
    pub async fn kill_character(&self, character_id: i32) -> Result<(), DataSourceError> {
        self.source
            .write(
                "kill_character_rollup",
                || {
                    "UPDATE profile p SET survival_attempts = p.survival_attempts + 1, \
                     total_survivor_kills = p.total_survivor_kills + s.survivor_kills, \
                     total_bandit_kills = p.total_bandit_kills + s.bandit_kills, \
                     total_zombie_kills = p.total_zombie_kills + s.zombie_kills, \
                     total_headshots = p.total_headshots + s.headshots, \
                     total_survival_time = p.total_survival_time + s.survival_time \
                     FROM survivor s \
                     WHERE s.unique_id = p.unique_id AND s.id = $1 AND NOT s.is_dead"
                        .to_owned()
                },
                vec![SqlParam::Int32(character_id)],
            )
            .await?;
        self.source
            .write(
                "kill_character",
                || "UPDATE survivor SET is_dead = TRUE WHERE id = $1".to_owned(),
                vec![SqlParam::Int32(character_id)],
            )
            .await
    }

    /// Append an audit row. Unknown action codes record nothing.
    pub async fn record_log_entry(
        &self,
        player_id: &str,
        character_id: i32,
        server_id: i32,
        action: i32,
    ) -> Result<(), DataSourceError> {
        let Some(code) = LogCode::from_action(action) else {
            tracing::debug!(player_id, character_id, action, "Ignoring unknown log action");
            return Ok(());
        };
        self.source
            .write(
                "record_log_entry",
                || {
                    "INSERT INTO log_entry (unique_id, log_code_id, instance_id) \
                     SELECT $1, lc.id, $2 FROM log_code lc WHERE lc.name = $3"
                        .to_owned()
                },
                vec![
                    SqlParam::text(player_id),
                    SqlParam::Int32(server_id),
                    SqlParam::text(code.name()),
                ],
            )
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::panic)]
mod tests {
    use super::*;
    use crate::database::ExecMode;
    use crate::fake::{FakeDatabase, row};

    const PROFILE: &str = "FROM profile WHERE unique_id";
    const LIVING: &str = "s.model";
    const NEW_ID: &str = "SELECT s.id FROM survivor";
    const DETAILS: &str = "p.humanity";

    fn source(db: &Arc<FakeDatabase>) -> CharacterDataSource<FakeDatabase> {
        CharacterDataSource::new(Arc::clone(db), &CharacterConfig::default(), false)
    }

    fn fields(pairs: &[(&str, Value)]) -> CharacterFields {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), v.clone()))
            .collect()
    }

    fn living_row(id: &str) -> Row {
        row(&[
            Some(id),
            Some("[329,[100.5,200.25,0.0]]"),
            Some(r#"[["ItemMap"],[]]"#),
            None,
            Some("600"),
            Some("12"),
            None,
            Some(r#""Survivor2_DZ""#),
        ])
    }

    #[tokio::test]
    async fn login_existing_character_returns_stored_fields() {
        let db = FakeDatabase::shared();
        db.respond(PROFILE, vec![row(&[Some("Bob")])]);
        db.respond(LIVING, vec![living_row("42")]);

        let response = source(&db).login_player("76561198", 1, "Bob").await.unwrap();
        assert_eq!(
            response.into_value().to_string(),
            r#"["PASS",false,"42",[329,[100.5,200.25,0.0]],[["ItemMap"],[]],[],[600,12,0],"Survivor2_DZ",0.96]"#
        );
        let touch = db.execution("touch_character");
        assert_eq!(touch.params, vec![SqlParam::Int32(42)]);
        assert_eq!(touch.mode, ExecMode::Deferred);
    }

    #[tokio::test]
    async fn login_with_same_name_does_not_rename() {
        let db = FakeDatabase::shared();
        db.respond(PROFILE, vec![row(&[Some("Bob")])]);
        db.respond(LIVING, vec![living_row("42")]);
        let characters = source(&db);

        characters.login_player("76561198", 1, "Bob").await.unwrap();
        characters.login_player("76561198", 1, "Bob").await.unwrap();
        assert!(!db.executed_keys().contains(&"rename_profile"));
    }

    #[tokio::test]
    async fn login_with_new_name_renames() {
        let db = FakeDatabase::shared();
        db.respond(PROFILE, vec![row(&[Some("Bob")])]);
        db.respond(LIVING, vec![living_row("42")]);

        source(&db).login_player("76561198", 1, "Robert").await.unwrap();
        let rename = db.execution("rename_profile");
        assert_eq!(
            rename.params,
            vec![SqlParam::text("Robert"), SqlParam::text("76561198")]
        );
    }

    #[tokio::test]
    async fn first_login_creates_profile_and_character() {
        let db = FakeDatabase::shared();
        db.respond(NEW_ID, vec![row(&[Some("7")])]);

        let response = source(&db).login_player("76561198", 3, "Alice").await.unwrap();
        assert_eq!(
            response,
            LoginResponse::Created {
                new_player: true,
                character_id: 7,
                model: String::new(),
            }
        );
        assert_eq!(response.into_value().to_string(), r#"["PASS",true,"7","",0.96]"#);

        let profile = db.execution("insert_profile");
        assert_eq!(profile.mode, ExecMode::Sync);
        let insert = db.execution("insert_character");
        assert_eq!(insert.mode, ExecMode::Sync);
        assert_eq!(
            insert.params,
            vec![
                SqlParam::text("76561198"),
                SqlParam::text("[]"),
                SqlParam::text(NEW_CHARACTER_MEDICAL),
                SqlParam::Int32(3),
            ]
        );
        assert!(insert.sql.contains(r#""worldspace""#));
    }

    #[tokio::test]
    async fn profile_lost_to_a_concurrent_insert_is_not_new() {
        let db = FakeDatabase::shared();
        db.set_rows_affected("insert_profile", 0);
        db.respond(NEW_ID, vec![row(&[Some("7")])]);

        let response = source(&db).login_player("76561198", 3, "Alice").await.unwrap();
        assert!(matches!(response, LoginResponse::Created { new_player: false, .. }));
    }

    #[tokio::test]
    async fn missing_new_character_is_an_error_response() {
        let db = FakeDatabase::shared();
        let response = source(&db).login_player("76561198", 3, "Alice").await.unwrap();
        assert_eq!(response, LoginResponse::Error);
    }

    #[tokio::test]
    async fn unreadable_character_id_is_an_error_response() {
        let db = FakeDatabase::shared();
        db.respond(PROFILE, vec![row(&[Some("Bob")])]);
        db.respond(LIVING, vec![living_row("not-a-number")]);
        let response = source(&db).login_player("76561198", 1, "Bob").await.unwrap();
        assert_eq!(response, LoginResponse::Error);
        assert!(!db.executed_keys().contains(&"touch_character"));

        let db = FakeDatabase::shared();
        db.respond(NEW_ID, vec![row(&[None])]);
        let response = source(&db).login_player("76561198", 3, "Alice").await.unwrap();
        assert_eq!(response, LoginResponse::Error);
    }

    #[tokio::test]
    async fn failed_character_insert_is_an_error_response_unless_strict() {
        let db = FakeDatabase::shared();
        db.fail_statement("insert_character");
        let response = source(&db).login_player("76561198", 3, "Alice").await.unwrap();
        assert_eq!(response, LoginResponse::Error);

        let strict = CharacterDataSource::new(Arc::clone(&db), &CharacterConfig::default(), true);
        let err = strict.login_player("76561198", 3, "Alice").await.unwrap_err();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn unparsable_stored_fields_default_independently() {
        let db = FakeDatabase::shared();
        db.respond(PROFILE, vec![row(&[Some("Bob")])]);
        db.respond(
            LIVING,
            vec![row(&[
                Some("42"),
                Some("[329,[1,2"),
                Some("[[\"ItemMap\"],[]]"),
                Some("not sqf"),
                None,
                None,
                None,
                Some("Survivor3_DZ"),
            ])],
        );

        let response = source(&db).login_player("76561198", 1, "Bob").await.unwrap();
        let LoginResponse::Existing {
            worldspace,
            inventory,
            backpack,
            model,
            survival,
            ..
        } = response
        else {
            panic!("expected an existing character");
        };
        assert_eq!(worldspace, Value::empty_array());
        assert_eq!(inventory.to_string(), r#"[["ItemMap"],[]]"#);
        assert_eq!(backpack, Value::empty_array());
        assert_eq!(model, "Survivor3_DZ");
        assert_eq!(survival, SurvivalTimers::default());
    }

    #[tokio::test]
    async fn details_default_missing_columns() {
        let db = FakeDatabase::shared();
        db.respond(
            DETAILS,
            vec![row(&[
                Some("[90,[1.5,2.5,0.0]]"),
                Some("broken["),
                Some("5"),
                Some("2"),
                Some("1"),
                Some("0"),
                None,
                None,
            ])],
        );

        let details = source(&db).fetch_character_details(42).await.unwrap();
        assert_eq!(
            details.into_value().to_string(),
            r#"["PASS",[],[5,2,1,0],[],[90,[1.5,2.5,0.0]],2500]"#
        );
        assert_eq!(db.queries()[0].params, vec![SqlParam::Int32(42)]);
    }

    #[tokio::test]
    async fn details_miss_is_an_error_response() {
        let db = FakeDatabase::shared();
        let details = source(&db).fetch_character_details(42).await.unwrap();
        assert_eq!(details, DetailsResponse::Error);
    }

    #[tokio::test]
    async fn just_ate_true_sets_timestamp() {
        let db = FakeDatabase::shared();
        source(&db)
            .update_character(42, &fields(&[("just_ate", Value::Bool(true))]))
            .await
            .unwrap();
        let update = db.execution("update_character");
        assert_eq!(
            update.sql,
            r#"UPDATE survivor s SET "last_ate" = NOW() WHERE s.id = $1"#
        );
        assert_eq!(update.params, vec![SqlParam::Int32(42)]);
    }

    #[tokio::test]
    async fn just_ate_false_and_zero_deltas_issue_nothing() {
        let db = FakeDatabase::shared();
        source(&db)
            .update_character(
                42,
                &fields(&[
                    ("just_ate", Value::Bool(false)),
                    ("zombie_kills", Value::Int32(0)),
                    ("humanity", Value::Double(0.4)),
                    ("unknown_field", Value::Int32(9)),
                ]),
            )
            .await
            .unwrap();
        assert!(db.executions().is_empty());
    }

    #[tokio::test]
    async fn deltas_are_truncated_and_relative() {
        let db = FakeDatabase::shared();
        source(&db)
            .update_character(
                42,
                &fields(&[
                    ("zombie_kills", Value::Double(2.9)),
                    ("DistanceFoot", Value::Int32(-35)),
                    ("inventory", hive_sqf::parse(r#"[["ItemMap"],[]]"#).unwrap()),
                    ("model", Value::string("Sniper1_DZ")),
                ]),
            )
            .await
            .unwrap();
        let update = db.execution("update_character");
        assert_eq!(
            update.sql,
            r#"UPDATE survivor s SET "distance_foot" = s."distance_foot" + $2, "inventory" = $3, "model" = $4, "zombie_kills" = s."zombie_kills" + $5 WHERE s.id = $1"#
        );
        assert_eq!(
            update.params,
            vec![
                SqlParam::Int32(42),
                SqlParam::Int32(-35),
                SqlParam::text(r#"[["ItemMap"],[]]"#),
                SqlParam::text("Sniper1_DZ"),
                SqlParam::Int32(2),
            ]
        );
    }

    #[tokio::test]
    async fn humanity_targets_the_profile() {
        let db = FakeDatabase::shared();
        let characters = source(&db);
        characters
            .update_character(42, &fields(&[("humanity", Value::Int32(-120))]))
            .await
            .unwrap();
        characters
            .update_character(
                42,
                &fields(&[("humanity", Value::Int32(50)), ("headshots", Value::Int32(1))]),
            )
            .await
            .unwrap();

        let updates = db.executions();
        assert_eq!(
            updates[0].sql,
            "UPDATE profile p SET humanity = p.humanity + $2 FROM survivor s \
             WHERE s.unique_id = p.unique_id AND s.id = $1"
        );
        assert_eq!(updates[0].params, vec![SqlParam::Int32(42), SqlParam::Int32(-120)]);
        assert!(updates[1].sql.starts_with("WITH humanity_update AS (UPDATE profile p"));
        assert!(updates[1].sql.ends_with(
            r#"UPDATE survivor s SET "headshots" = s."headshots" + $3 WHERE s.id = $1"#
        ));
        assert_eq!(
            updates[1].params,
            vec![SqlParam::Int32(42), SqlParam::Int32(50), SqlParam::Int32(1)]
        );
    }

    #[tokio::test]
    async fn wrong_kinds_are_skipped() {
        let db = FakeDatabase::shared();
        source(&db)
            .update_character(
                42,
                &fields(&[
                    ("worldspace", Value::string("[1,2]")),
                    ("just_drank", Value::Int32(1)),
                    ("headshots", Value::string("3")),
                    ("model", Value::Int32(3)),
                    ("state", Value::empty_array()),
                ]),
            )
            .await
            .unwrap();
        let update = db.execution("update_character");
        assert_eq!(update.sql, r#"UPDATE survivor s SET "state" = $2 WHERE s.id = $1"#);
    }

    #[tokio::test]
    async fn configured_worldspace_column() {
        let db = FakeDatabase::shared();
        let config = CharacterConfig {
            worldspace_column: "pos".to_owned(),
        };
        let characters = CharacterDataSource::new(Arc::clone(&db), &config, false);
        characters
            .update_character(42, &fields(&[("worldspace", hive_sqf::parse("[0,[1,2,3]]").unwrap())]))
            .await
            .unwrap();
        assert_eq!(
            db.execution("update_character").sql,
            r#"UPDATE survivor s SET "pos" = $2 WHERE s.id = $1"#
        );
    }

    #[tokio::test]
    async fn init_character_matches_unique_id() {
        let db = FakeDatabase::shared();
        source(&db)
            .init_character(42, &Value::empty_array(), &Value::Array(vec![Value::string("DZ_Patrol_Pack_EP1")]))
            .await
            .unwrap();
        let init = db.execution("init_character");
        assert_eq!(
            init.params,
            vec![
                SqlParam::text("[]"),
                SqlParam::text(r#"["DZ_Patrol_Pack_EP1"]"#),
                SqlParam::text("42"),
            ]
        );
    }

    #[tokio::test]
    async fn kill_rolls_up_then_marks_dead() {
        let db = FakeDatabase::shared();
        source(&db).kill_character(42).await.unwrap();
        assert_eq!(db.executed_keys(), vec!["kill_character_rollup", "kill_character"]);
        let rollup = db.execution("kill_character_rollup");
        assert!(rollup.sql.contains("NOT s.is_dead"));
        assert!(rollup.sql.contains("total_zombie_kills = p.total_zombie_kills + s.zombie_kills"));
    }

    #[tokio::test]
    async fn log_entries_map_action_codes() {
        let db = FakeDatabase::shared();
        let characters = source(&db);
        characters.record_log_entry("76561198", 42, 1, 0).await.unwrap();
        characters.record_log_entry("76561198", 42, 1, 2).await.unwrap();
        characters.record_log_entry("76561198", 42, 1, 1).await.unwrap();

        let entries = db.executions();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].params[2], SqlParam::text("Login"));
        assert_eq!(entries[1].params[2], SqlParam::text("Disconnect"));
        assert_eq!(LogCode::from_action(5), None);
    }

    #[test]
    fn truncation_is_toward_zero() {
        assert_eq!(truncate_delta(2.9), Some(2));
        assert_eq!(truncate_delta(-2.9), Some(-2));
        assert_eq!(truncate_delta(1e12), None);
        assert_eq!(truncate_delta(f64::NAN), None);
    }

    #[test]
    fn model_unwraps_sqf_strings() {
        assert_eq!(parse_model(Some(r#""Survivor2_DZ""#)), "Survivor2_DZ");
        assert_eq!(parse_model(Some("Survivor2_DZ")), "Survivor2_DZ");
        assert_eq!(parse_model(None), "");
    }
}
