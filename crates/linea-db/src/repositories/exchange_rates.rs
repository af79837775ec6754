//! Exchange rate snapshots.
//!
//! Every refresh appends rows; reads only look at the newest row per pair.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use linea_core::{Currency, RateTable, RepositoryError};

use super::row_mappers::{encode_timestamp, map_sqlx_error, row_to_exchange_rate};

/// Exchange rate access over a borrowed connection.
pub struct ExchangeRateRepository<'c> {
    conn: &'c mut SqliteConnection,
}

impl<'c> ExchangeRateRepository<'c> {
    pub fn new(conn: &'c mut SqliteConnection) -> Self {
        Self { conn }
    }

    /// Newest stored rate for every pair.
    pub async fn latest(&mut self) -> Result<RateTable, RepositoryError> {
        let rows = sqlx::query(
            "SELECT r.base_currency, r.target_currency, r.rate, r.fetched_at, r.expires_at
             FROM exchange_rates r
             JOIN (
                 SELECT base_currency, target_currency, MAX(fetched_at) AS fetched_at
                 FROM exchange_rates
                 GROUP BY base_currency, target_currency
             ) newest USING (base_currency, target_currency, fetched_at)
             ORDER BY r.base_currency, r.target_currency",
        )
        .fetch_all(&mut *self.conn)
        .await
        .map_err(map_sqlx_error)?;

        let rates = rows
            .iter()
            .map(row_to_exchange_rate)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(RateTable::new(rates))
    }

    /// When rates for `base` were last fetched.
    pub async fn last_fetched(
        &mut self,
        base: Currency,
    ) -> Result<Option<DateTime<Utc>>, RepositoryError> {
        let (fetched_at,): (Option<DateTime<Utc>>,) =
            sqlx::query_as("SELECT MAX(fetched_at) FROM exchange_rates WHERE base_currency = ?")
                .bind(base.code())
                .fetch_one(&mut *self.conn)
                .await
                .map_err(map_sqlx_error)?;
        Ok(fetched_at)
    }

    /// Append a snapshot of `1 base = rate target` rows.
    ///
    /// Non-positive rates are skipped. Returns the number of rows written.
    pub async fn store(
        &mut self,
        base: Currency,
        rates: &BTreeMap<Currency, f64>,
        fetched_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<usize, RepositoryError> {
        let usable: Vec<(Currency, f64)> = rates
            .iter()
            .filter(|(target, rate)| **target != base && rate.is_finite() && **rate > 0.0)
            .map(|(target, rate)| (*target, *rate))
            .collect();
        if usable.is_empty() {
            return Ok(0);
        }

        let fetched = encode_timestamp(fetched_at);
        let expires = encode_timestamp(fetched_at + ttl);

        let mut query: QueryBuilder<'_, Sqlite> = QueryBuilder::new(
            "INSERT INTO exchange_rates (base_currency, target_currency, rate, fetched_at, expires_at) ",
        );
        query.push_values(&usable, |mut row, (target, rate)| {
            row.push_bind(base.code())
                .push_bind(target.code())
                .push_bind(*rate)
                .push_bind(fetched.clone())
                .push_bind(expires.clone());
        });

        query
            .build()
            .execute(&mut *self.conn)
            .await
            .map_err(map_sqlx_error)?;

        tracing::debug!(base = %base, count = usable.len(), "Stored exchange rates");
        Ok(usable.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::DbSession;
    use crate::setup::setup_test_database;

    #[tokio::test]
    async fn test_latest_returns_newest_snapshot_per_pair() {
        let pool = setup_test_database().await.unwrap();
        let mut session = DbSession::open(&pool).await.unwrap();
        let mut repo = session.exchange_rates();

        let earlier = Utc::now() - Duration::hours(2);
        let later = Utc::now();
        repo.store(Currency::Usd, &BTreeMap::from([(Currency::Eur, 0.8)]), earlier, Duration::hours(1))
            .await
            .unwrap();
        repo.store(
            Currency::Usd,
            &BTreeMap::from([(Currency::Eur, 0.9), (Currency::Usd, 1.0), (Currency::Gbp, -1.0)]),
            later,
            Duration::hours(1),
        )
        .await
        .unwrap();

        let table = repo.latest().await.unwrap();
        assert_eq!(table.rates().len(), 1);
        let rate = table.lookup(Currency::Usd, Currency::Eur, Currency::Usd).unwrap();
        assert!((rate.rate - 0.9).abs() < 1e-12);
        assert!(!rate.is_expired(Utc::now()));

        let last = repo.last_fetched(Currency::Usd).await.unwrap().unwrap();
        assert_eq!(encode_timestamp(last), encode_timestamp(later));
        assert_eq!(repo.last_fetched(Currency::Eur).await.unwrap(), None);
    }
}
