//! Plugin catalog repositories - `plugins`, `plugin_event_handlers` 테이블 CRUD
//!
//! 레포지토리는 `&Connection` 위에서 동작하므로 `Storage::transaction` 안에서
//! 받은 `Transaction`을 그대로 넘겨 하나의 트랜잭션으로 묶을 수 있습니다.

use crate::{Error, Result};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use serde::{Deserialize, Serialize};

// ============================================================================
// Models
// ============================================================================

/// 설치 출처: 로컬 아카이브
pub const SOURCE_LOCAL: i32 = 0;

/// 이벤트의 다른 핸들러보다 먼저 실행되는 핸들러 타입
pub const HANDLER_TYPE_FIRST: &str = "first";

/// 이벤트의 다른 핸들러보다 나중에 실행되는 핸들러 타입
pub const HANDLER_TYPE_LAST: &str = "last";

/// 등록된 플러그인 레코드
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginRecord {
    pub id: i64,
    /// 불변 식별자 (최초 등록 시 결정)
    pub code: String,
    /// 표시 이름이자 디렉토리 이름
    pub name: String,
    pub version: String,
    /// 매니페스트 `event` 필드 (엔트리포인트)
    pub class_name: Option<String>,
    pub enabled: bool,
    pub source: i32,
    pub deleted: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// 신규 플러그인 행
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPlugin {
    pub code: String,
    pub name: String,
    pub version: String,
    pub class_name: Option<String>,
    pub enabled: bool,
    pub source: i32,
}

/// 플러그인 이벤트 핸들러 레코드
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginEventHandlerRecord {
    pub id: i64,
    pub plugin_id: i64,
    pub event: String,
    pub handler: String,
    pub handler_type: String,
    pub priority: i64,
    pub deleted: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// 신규 핸들러 행
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEventHandler {
    pub plugin_id: i64,
    pub event: String,
    pub handler: String,
    pub handler_type: String,
    pub priority: i64,
}

// ============================================================================
// Helpers
// ============================================================================

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

fn is_unique_constraint_error(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    ) && err.to_string().contains("UNIQUE")
}

const PLUGIN_COLUMNS: &str =
    "id, code, name, version, class_name, enabled, source, deleted, created_at, updated_at";

const HANDLER_COLUMNS: &str =
    "id, plugin_id, event, handler, handler_type, priority, deleted, created_at, updated_at";

const QUALIFIED_HANDLER_COLUMNS: &str = "h.id, h.plugin_id, h.event, h.handler, h.handler_type, \
     h.priority, h.deleted, h.created_at, h.updated_at";

fn scan_plugin(row: &rusqlite::Row) -> rusqlite::Result<PluginRecord> {
    Ok(PluginRecord {
        id: row.get(0)?,
        code: row.get(1)?,
        name: row.get(2)?,
        version: row.get(3)?,
        class_name: row.get(4)?,
        enabled: row.get(5)?,
        source: row.get(6)?,
        deleted: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

fn scan_handler(row: &rusqlite::Row) -> rusqlite::Result<PluginEventHandlerRecord> {
    Ok(PluginEventHandlerRecord {
        id: row.get(0)?,
        plugin_id: row.get(1)?,
        event: row.get(2)?,
        handler: row.get(3)?,
        handler_type: row.get(4)?,
        priority: row.get(5)?,
        deleted: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

// ============================================================================
// PluginRepository
// ============================================================================

/// `plugins` 테이블 레포지토리
pub struct PluginRepository<'a> {
    conn: &'a Connection,
}

impl<'a> PluginRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// ID로 조회 (삭제된 플러그인 포함)
    pub fn find_by_id(&self, id: i64) -> Result<Option<PluginRecord>> {
        let sql = format!("SELECT {} FROM plugins WHERE id = ?1", PLUGIN_COLUMNS);
        Ok(self
            .conn
            .query_row(&sql, params![id], scan_plugin)
            .optional()?)
    }

    /// code로 삭제되지 않은 플러그인 조회
    pub fn find_by_code(&self, code: &str) -> Result<Option<PluginRecord>> {
        let sql = format!(
            "SELECT {} FROM plugins WHERE code = ?1 AND deleted = 0",
            PLUGIN_COLUMNS
        );
        Ok(self
            .conn
            .query_row(&sql, params![code], scan_plugin)
            .optional()?)
    }

    /// 전체 플러그인 목록
    pub fn find_all(&self, include_deleted: bool) -> Result<Vec<PluginRecord>> {
        let sql = if include_deleted {
            format!("SELECT {} FROM plugins ORDER BY id", PLUGIN_COLUMNS)
        } else {
            format!(
                "SELECT {} FROM plugins WHERE deleted = 0 ORDER BY id",
                PLUGIN_COLUMNS
            )
        };

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], scan_plugin)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// 플러그인 삽입, 생성된 ID 반환.
    ///
    /// 삭제되지 않은 플러그인과 code가 겹치면 `DuplicateCode`.
    pub fn insert(&self, plugin: &NewPlugin) -> Result<i64> {
        let now = now_rfc3339();
        let result = self.conn.execute(
            r#"
            INSERT INTO plugins
                (code, name, version, class_name, enabled, source, deleted, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7, ?7)
            "#,
            params![
                plugin.code,
                plugin.name,
                plugin.version,
                plugin.class_name,
                plugin.enabled,
                plugin.source,
                now,
            ],
        );

        match result {
            Ok(_) => Ok(self.conn.last_insert_rowid()),
            Err(err) if is_unique_constraint_error(&err) => {
                Err(Error::DuplicateCode(plugin.code.clone()))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// 변경 가능한 컬럼 저장 (code는 불변)
    pub fn update(&self, plugin: &PluginRecord) -> Result<()> {
        let rows = self.conn.execute(
            r#"
            UPDATE plugins SET
                name = ?2,
                version = ?3,
                class_name = ?4,
                enabled = ?5,
                deleted = ?6,
                updated_at = ?7
            WHERE id = ?1
            "#,
            params![
                plugin.id,
                plugin.name,
                plugin.version,
                plugin.class_name,
                plugin.enabled,
                plugin.deleted,
                now_rfc3339(),
            ],
        )?;

        if rows == 0 {
            return Err(Error::PluginNotFound(format!("id {}", plugin.id)));
        }
        Ok(())
    }
}

// ============================================================================
// PluginEventHandlerRepository
// ============================================================================

/// `plugin_event_handlers` 테이블 레포지토리
pub struct PluginEventHandlerRepository<'a> {
    conn: &'a Connection,
}

impl<'a> PluginEventHandlerRepository<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// 플러그인 소유 핸들러 목록
    pub fn find_by_plugin_id(
        &self,
        plugin_id: i64,
        include_deleted: bool,
    ) -> Result<Vec<PluginEventHandlerRecord>> {
        let filter = if include_deleted { "" } else { " AND deleted = 0" };
        let sql = format!(
            "SELECT {} FROM plugin_event_handlers WHERE plugin_id = ?1{} ORDER BY id",
            HANDLER_COLUMNS, filter
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![plugin_id], scan_handler)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// plugin + event + handler 조합의 활성 행 조회
    pub fn find_active(
        &self,
        plugin_id: i64,
        event: &str,
        handler: &str,
    ) -> Result<Option<PluginEventHandlerRecord>> {
        let sql = format!(
            "SELECT {} FROM plugin_event_handlers
             WHERE plugin_id = ?1 AND event = ?2 AND handler = ?3 AND deleted = 0
             ORDER BY id LIMIT 1",
            HANDLER_COLUMNS
        );
        Ok(self
            .conn
            .query_row(&sql, params![plugin_id, event, handler], scan_handler)
            .optional()?)
    }

    /// (event, handler_type) 범위에서 새 핸들러의 우선순위 계산.
    ///
    /// 활성 행이 없으면 0, 있으면 현재 최대값 + 1.
    pub fn calc_new_priority(&self, event: &str, handler_type: &str) -> Result<i64> {
        let max: Option<i64> = self.conn.query_row(
            "SELECT MAX(priority) FROM plugin_event_handlers
             WHERE event = ?1 AND handler_type = ?2 AND deleted = 0",
            params![event, handler_type],
            |row| row.get(0),
        )?;
        Ok(max.map_or(0, |m| m + 1))
    }

    /// 핸들러 삽입, 생성된 ID 반환
    pub fn insert(&self, handler: &NewEventHandler) -> Result<i64> {
        let now = now_rfc3339();
        self.conn.execute(
            r#"
            INSERT INTO plugin_event_handlers
                (plugin_id, event, handler, handler_type, priority, deleted, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?6)
            "#,
            params![
                handler.plugin_id,
                handler.event,
                handler.handler,
                handler.handler_type,
                handler.priority,
                now,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// 플러그인 소유 활성 핸들러 전체 soft delete, 변경된 행 수 반환
    pub fn soft_delete_by_plugin_id(&self, plugin_id: i64) -> Result<usize> {
        Ok(self.conn.execute(
            "UPDATE plugin_event_handlers SET deleted = 1, updated_at = ?2
             WHERE plugin_id = ?1 AND deleted = 0",
            params![plugin_id, now_rfc3339()],
        )?)
    }

    /// 이벤트 디스패치 대상 핸들러 (활성 플러그인 + 활성 핸들러), 실행 순서대로.
    ///
    /// 순서: `first` → 그 외 타입 (`service` 등) → `last`, 같은 등급 안에서는
    /// handler_type, priority, id 순.
    pub fn find_dispatchable(&self, event: &str) -> Result<Vec<PluginEventHandlerRecord>> {
        let sql = format!(
            "SELECT {} FROM plugin_event_handlers h
             WHERE h.event = ?1 AND h.deleted = 0
               AND EXISTS (
                   SELECT 1 FROM plugins p
                   WHERE p.id = h.plugin_id AND p.deleted = 0 AND p.enabled = 1
               )
             ORDER BY
                 CASE h.handler_type WHEN ?2 THEN 0 WHEN ?3 THEN 2 ELSE 1 END,
                 h.handler_type, h.priority, h.id",
            QUALIFIED_HANDLER_COLUMNS
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![event, HANDLER_TYPE_FIRST, HANDLER_TYPE_LAST],
            scan_handler,
        )?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}
