use chrono::{Datelike, NaiveDate, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::*;
use tracing::{debug, warn};

use crate::models::sequence_counter;
use crate::utils::error::AppError;

const MAX_ATTEMPTS: usize = 8;

/// Familles de numéros du centre (préfixe CI.)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceKind {
    Devis,
    Session,
    Inspection,
    DetailedInspection,
    Facture,
}

impl SequenceKind {
    pub fn code(&self) -> &'static str {
        match self {
            SequenceKind::Devis => "DEV",
            SequenceKind::Session => "DES",
            SequenceKind::Inspection => "ICE",
            SequenceKind::DetailedInspection => "ICP",
            SequenceKind::Facture => "FAC",
        }
    }
}

/// Format: CI.DEV YYMM NNN
pub fn format_numero(kind: SequenceKind, date: NaiveDate, value: i64) -> String {
    format!(
        "CI.{} {:02}{:02} {:03}",
        kind.code(),
        date.year() % 100,
        date.month(),
        value
    )
}

/// Portée d'un compteur: par année civile, et par session pour CI.DES
pub fn scope_key(kind: SequenceKind, year: i32, session: Option<&str>) -> String {
    match session {
        Some(session) => format!("{}:{}:{}", kind.code(), year, session.trim().to_lowercase()),
        None => format!("{}:{}", kind.code(), year),
    }
}

pub struct NumberingService;

impl NumberingService {
    /// Réserve le prochain numéro d'une famille pour la date donnée
    pub async fn next_numero(
        db: &DatabaseConnection,
        kind: SequenceKind,
        date: NaiveDate,
        session: Option<&str>,
    ) -> Result<String, AppError> {
        let scope = scope_key(kind, date.year(), session);
        let value = Self::next_value(db, &scope).await?;
        Ok(format_numero(kind, date, value))
    }

    /// Incrément atomique d'un compteur.
    /// La mise à jour est conditionnée à la valeur lue: si un autre appel est
    /// passé entre-temps, aucune ligne n'est modifiée et on recommence.
    pub async fn next_value(db: &DatabaseConnection, scope: &str) -> Result<i64, AppError> {
        for attempt in 1..=MAX_ATTEMPTS {
            let txn = db.begin().await?;

            let current = sequence_counter::Entity::find_by_id(scope.to_string())
                .one(&txn)
                .await?;

            let next = match current {
                None => {
                    let counter = sequence_counter::ActiveModel {
                        scope: Set(scope.to_string()),
                        value: Set(1),
                        updated_at: Set(Utc::now()),
                    };
                    match sequence_counter::Entity::insert(counter)
                        .exec_without_returning(&txn)
                        .await
                    {
                        Ok(_) => 1,
                        Err(e) if is_unique_violation(&e) => {
                            txn.rollback().await?;
                            debug!(scope, attempt, "counter created concurrently, retrying");
                            continue;
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
                Some(counter) => {
                    let next = counter.value + 1;
                    let result = sequence_counter::Entity::update_many()
                        .col_expr(sequence_counter::Column::Value, Expr::value(next))
                        .col_expr(sequence_counter::Column::UpdatedAt, Expr::value(Utc::now()))
                        .filter(sequence_counter::Column::Scope.eq(scope))
                        .filter(sequence_counter::Column::Value.eq(counter.value))
                        .exec(&txn)
                        .await?;

                    if result.rows_affected == 0 {
                        txn.rollback().await?;
                        debug!(scope, attempt, "counter moved concurrently, retrying");
                        continue;
                    }
                    next
                }
            };

            txn.commit().await?;
            return Ok(next);
        }

        warn!(scope, "sequence contention, giving up");
        Err(AppError::Conflict(format!(
            "Could not reserve a number for {}, please retry",
            scope
        )))
    }
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_db;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_format_numero() {
        assert_eq!(
            format_numero(SequenceKind::Devis, date(2025, 10, 3), 7),
            "CI.DEV 2510 007"
        );
        assert_eq!(
            format_numero(SequenceKind::DetailedInspection, date(2026, 1, 31), 1234),
            "CI.ICP 2601 1234"
        );
    }

    #[test]
    fn test_scope_key() {
        assert_eq!(scope_key(SequenceKind::Devis, 2025, None), "DEV:2025");
        assert_eq!(
            scope_key(SequenceKind::Session, 2025, Some(" 2025 Octobre N1 ")),
            "DES:2025:2025 octobre n1"
        );
    }

    #[actix_web::test]
    async fn test_sequential_numbers_strictly_increase() {
        let db = test_db().await;
        let day = date(2025, 10, 13);

        let mut numeros = Vec::new();
        for _ in 0..5 {
            numeros.push(
                NumberingService::next_numero(&db, SequenceKind::Devis, day, None)
                    .await
                    .unwrap(),
            );
        }

        assert_eq!(
            numeros,
            vec![
                "CI.DEV 2510 001",
                "CI.DEV 2510 002",
                "CI.DEV 2510 003",
                "CI.DEV 2510 004",
                "CI.DEV 2510 005",
            ]
        );
    }

    #[actix_web::test]
    async fn test_counter_continues_across_months_and_resets_per_year() {
        let db = test_db().await;

        let a = NumberingService::next_numero(&db, SequenceKind::Facture, date(2025, 11, 2), None)
            .await
            .unwrap();
        let b = NumberingService::next_numero(&db, SequenceKind::Facture, date(2025, 12, 2), None)
            .await
            .unwrap();
        let c = NumberingService::next_numero(&db, SequenceKind::Facture, date(2026, 1, 5), None)
            .await
            .unwrap();

        assert_eq!(a, "CI.FAC 2511 001");
        assert_eq!(b, "CI.FAC 2512 002");
        assert_eq!(c, "CI.FAC 2601 001");
    }

    #[actix_web::test]
    async fn test_session_counters_are_independent() {
        let db = test_db().await;
        let day = date(2025, 10, 1);

        let a1 = NumberingService::next_numero(&db, SequenceKind::Session, day, Some("octobre A"))
            .await
            .unwrap();
        let b1 = NumberingService::next_numero(&db, SequenceKind::Session, day, Some("octobre B"))
            .await
            .unwrap();
        let a2 = NumberingService::next_numero(&db, SequenceKind::Session, day, Some("octobre A"))
            .await
            .unwrap();

        assert_eq!(a1, "CI.DES 2510 001");
        assert_eq!(b1, "CI.DES 2510 001");
        assert_eq!(a2, "CI.DES 2510 002");
    }
}
