//! Statement and transaction persistence.

use std::str::FromStr;

use amlscan_core::{
    new_id, Channel, Direction, NormalizedTransaction, ParseMethod, RuleExplain, StatementInfo,
};
use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension};
use rust_decimal::Decimal;
use tracing::info;

use crate::db::Store;
use crate::error::{StoreError, StoreResult};

fn decimal_to_sql(value: Option<Decimal>) -> Option<String> {
    value.map(|d| d.to_string())
}

fn decimal_from_sql(value: Option<String>) -> StoreResult<Option<Decimal>> {
    value
        .map(|s| Decimal::from_str(&s).map_err(|e| StoreError::CorruptData(e.to_string())))
        .transpose()
}

fn date_to_sql(value: Option<NaiveDate>) -> Option<String> {
    value.map(|d| d.format("%Y-%m-%d").to_string())
}

fn date_from_sql(value: &str) -> StoreResult<NaiveDate> {
    value
        .parse()
        .map_err(|_| StoreError::CorruptData(format!("bad date '{value}'")))
}

/// Audit metadata stored alongside a statement.
#[derive(Debug, Clone, Default)]
pub struct StatementAudit {
    pub ocr_used: bool,
    pub ocr_confidence: f64,
    pub parser_version: String,
    pub pdf_hash: String,
    pub balance_valid: bool,
    pub warnings: Vec<String>,
}

impl Store {
    /// Persist a parsed statement header. One row per parse; re-parsing a
    /// document creates a new statement record.
    pub fn save_statement(
        &self,
        case_id: &str,
        info: &StatementInfo,
        method: ParseMethod,
        audit: &StatementAudit,
    ) -> StoreResult<String> {
        self.save_statement_as(&new_id(), case_id, info, method, audit)
    }

    /// Delete a statement and everything hanging off it (transactions,
    /// classifications, assessments cascade).
    pub fn delete_statement(&self, statement_id: &str) -> StoreResult<()> {
        self.conn()?
            .execute("DELETE FROM statements WHERE id = ?1", [statement_id])?;
        Ok(())
    }

    /// Persist a statement under an explicit id. Used by overwrite re-runs
    /// that keep the original statement id after deleting the old data.
    pub fn save_statement_as(
        &self,
        id: &str,
        case_id: &str,
        info: &StatementInfo,
        method: ParseMethod,
        audit: &StatementAudit,
    ) -> StoreResult<String> {
        let id = id.to_string();
        self.conn()?.execute(
            "INSERT INTO statements
               (id, case_id, bank_id, bank_name, account_number, account_holder,
                period_from, period_to, opening_balance, closing_balance,
                available_balance, currency,
                declared_credits_sum, declared_credits_count,
                declared_debits_sum, declared_debits_count,
                parse_method, ocr_used, ocr_confidence, parser_version,
                pdf_hash, balance_valid, warnings)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12,
                     ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23)",
            params![
                id,
                case_id,
                info.bank_id,
                info.bank_name,
                info.account_number,
                info.account_holder,
                date_to_sql(info.period_from),
                date_to_sql(info.period_to),
                decimal_to_sql(info.opening_balance),
                decimal_to_sql(info.closing_balance),
                decimal_to_sql(info.available_balance),
                info.currency,
                decimal_to_sql(info.declared_credits_sum),
                info.declared_credits_count,
                decimal_to_sql(info.declared_debits_sum),
                info.declared_debits_count,
                method.as_str(),
                audit.ocr_used,
                audit.ocr_confidence,
                audit.parser_version,
                audit.pdf_hash,
                audit.balance_valid,
                serde_json::to_string(&audit.warnings)?,
            ],
        )?;
        info!(statement_id = %id, case_id, "statement saved");
        Ok(id)
    }

    /// Existing statement id for a document hash, if one was parsed before.
    pub fn find_statement_by_pdf_hash(&self, pdf_hash: &str) -> StoreResult<Option<String>> {
        let conn = self.conn()?;
        let id = conn
            .query_row(
                "SELECT id FROM statements WHERE pdf_hash = ?1 ORDER BY created_at DESC LIMIT 1",
                [pdf_hash],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    /// Persist all transactions of one statement in a single transaction.
    ///
    /// An empty `counterparty_id` is stored as NULL to satisfy the foreign
    /// key.
    pub fn save_transactions(&self, transactions: &[NormalizedTransaction]) -> StoreResult<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO transactions
                   (id, statement_id, counterparty_id, booking_date, tx_date,
                    amount, currency, direction, balance_after,
                    channel, category, subcategory, risk_tags, risk_score,
                    title, counterparty_raw, bank_category, raw_text,
                    rule_explains, urls, is_recurring, recurring_group, tx_hash)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12,
                         ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23)",
            )?;
            for t in transactions {
                let counterparty_id = t.counterparty_id.as_deref().filter(|s| !s.is_empty());
                stmt.execute(params![
                    t.id,
                    t.statement_id,
                    counterparty_id,
                    t.booking_date.format("%Y-%m-%d").to_string(),
                    t.value_date.format("%Y-%m-%d").to_string(),
                    t.amount.to_string(),
                    t.currency,
                    t.direction.as_str(),
                    decimal_to_sql(t.balance_after),
                    t.channel.as_str(),
                    t.category,
                    t.subcategory,
                    serde_json::to_string(&t.risk_tags)?,
                    t.risk_score,
                    t.title,
                    t.counterparty_raw,
                    t.bank_category,
                    t.raw_text,
                    serde_json::to_string(&t.rule_explains)?,
                    serde_json::to_string(&t.urls)?,
                    t.is_recurring,
                    t.recurring_group,
                    t.tx_hash,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Load a statement's transactions in booking order.
    pub fn load_transactions(
        &self,
        statement_id: &str,
    ) -> StoreResult<Vec<NormalizedTransaction>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, statement_id, counterparty_id, booking_date, tx_date,
                    amount, currency, direction, balance_after,
                    channel, category, subcategory, risk_tags, risk_score,
                    title, counterparty_raw, bank_category, raw_text,
                    rule_explains, urls, is_recurring, recurring_group, tx_hash
             FROM transactions WHERE statement_id = ?1
             ORDER BY booking_date, id",
        )?;
        let rows = stmt.query_map([statement_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, String>(6)?,
                row.get::<_, String>(7)?,
                row.get::<_, Option<String>>(8)?,
                row.get::<_, String>(9)?,
                row.get::<_, String>(10)?,
                row.get::<_, String>(11)?,
                row.get::<_, String>(12)?,
                row.get::<_, i64>(13)?,
                row.get::<_, String>(14)?,
                row.get::<_, String>(15)?,
                row.get::<_, String>(16)?,
                row.get::<_, String>(17)?,
                row.get::<_, String>(18)?,
                row.get::<_, String>(19)?,
                row.get::<_, bool>(20)?,
                row.get::<_, String>(21)?,
                row.get::<_, String>(22)?,
            ))
        })?;

        let mut result = Vec::new();
        for row in rows {
            let (
                id,
                statement_id,
                counterparty_id,
                booking_date,
                tx_date,
                amount,
                currency,
                direction,
                balance_after,
                channel,
                category,
                subcategory,
                risk_tags,
                risk_score,
                title,
                counterparty_raw,
                bank_category,
                raw_text,
                rule_explains,
                urls,
                is_recurring,
                recurring_group,
                tx_hash,
            ) = row?;

            let amount = Decimal::from_str(&amount)
                .map_err(|e| StoreError::CorruptData(e.to_string()))?;
            let direction = match direction.as_str() {
                "DEBIT" => Direction::Debit,
                _ => Direction::Credit,
            };
            let risk_tags: Vec<String> = serde_json::from_str(&risk_tags)?;
            let rule_explains: Vec<RuleExplain> = serde_json::from_str(&rule_explains)?;
            let urls: Vec<String> = serde_json::from_str(&urls)?;

            result.push(NormalizedTransaction {
                id,
                statement_id,
                booking_date: date_from_sql(&booking_date)?,
                value_date: date_from_sql(&tx_date)?,
                amount,
                currency,
                direction,
                balance_after: decimal_from_sql(balance_after)?,
                counterparty_raw: counterparty_raw.clone(),
                counterparty_clean: amlscan_core::clean_text(&counterparty_raw),
                counterparty_id,
                title: title.clone(),
                title_clean: amlscan_core::clean_text(&title),
                bank_category,
                raw_text,
                channel: Channel::parse(&channel),
                category,
                subcategory,
                risk_tags,
                risk_score: risk_score.clamp(0, 100) as u8,
                rule_explains,
                is_recurring,
                recurring_group,
                urls,
                tx_hash,
            });
        }
        Ok(result)
    }

    /// Track the analyzed account across statements.
    ///
    /// One row per account number; each statement bumps the counter and
    /// refreshes the last-seen timestamp.
    pub fn upsert_account_profile(
        &self,
        account_number: &str,
        account_holder: &str,
        bank_id: &str,
    ) -> StoreResult<()> {
        if account_number.is_empty() {
            return Ok(());
        }
        self.conn()?.execute(
            "INSERT INTO account_profiles (id, account_number, account_holder, bank_id, statement_count)
             VALUES (?1, ?2, ?3, ?4, 1)
             ON CONFLICT(account_number) DO UPDATE SET
               account_holder = CASE WHEN excluded.account_holder != '' THEN excluded.account_holder
                                     ELSE account_profiles.account_holder END,
               statement_count = account_profiles.statement_count + 1,
               last_seen = strftime('%Y-%m-%dT%H:%M:%SZ', 'now')",
            params![new_id(), account_number, account_holder, bank_id],
        )?;
        Ok(())
    }

    /// Statement count recorded for an account, 0 when unseen.
    pub fn account_statement_count(&self, account_number: &str) -> StoreResult<i64> {
        let conn = self.conn()?;
        let count = conn
            .query_row(
                "SELECT statement_count FROM account_profiles WHERE account_number = ?1",
                [account_number],
                |row| row.get(0),
            )
            .optional()?;
        Ok(count.unwrap_or(0))
    }

    /// Update one editable statement header field (user correction).
    ///
    /// Only whitelisted fields can change; parser provenance fields stay
    /// immutable.
    pub fn update_statement_field(
        &self,
        statement_id: &str,
        field: &str,
        value: &str,
    ) -> StoreResult<bool> {
        const EDITABLE: &[&str] = &[
            "account_number",
            "account_holder",
            "period_from",
            "period_to",
            "opening_balance",
            "closing_balance",
            "available_balance",
            "currency",
            "declared_credits_sum",
            "declared_credits_count",
            "declared_debits_sum",
            "declared_debits_count",
        ];
        if !EDITABLE.contains(&field) {
            tracing::warn!(field, "rejected update of non-editable statement field");
            return Ok(false);
        }
        let sql = format!("UPDATE statements SET {field} = ?1 WHERE id = ?2");
        self.conn()?.execute(&sql, params![value, statement_id])?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::temp_store;
    use amlscan_core::{normalize_transactions, RawTransaction};
    use rust_decimal_macros::dec;

    fn sample_statement(store: &Store) -> (String, String) {
        let project = store.default_aml_project_id().unwrap();
        let case = store.create_case(&project, "test", "aml").unwrap();
        let mut info = StatementInfo::new("ing", "ING Bank Śląski");
        info.opening_balance = Some(dec!(1000.00));
        info.closing_balance = Some(dec!(4050.00));
        let audit = StatementAudit {
            pdf_hash: "abc123".into(),
            balance_valid: true,
            ..Default::default()
        };
        let statement = store
            .save_statement(&case, &info, ParseMethod::Spatial, &audit)
            .unwrap();
        (case, statement)
    }

    #[test]
    fn test_save_and_load_transactions() {
        let (store, _dir) = temp_store();
        let (_case, statement_id) = sample_statement(&store);

        let raw = vec![
            RawTransaction::new("2024-01-05".parse().unwrap(), dec!(-150.00))
                .with_counterparty("BIEDRONKA")
                .with_title("Zakup")
                .with_bank_category("TR.KART"),
            RawTransaction::new("2024-01-10".parse().unwrap(), dec!(5000.00))
                .with_counterparty("FIRMA XYZ")
                .with_bank_category("PRZELEW"),
        ];
        let txns = normalize_transactions(&raw, &statement_id);
        store.save_transactions(&txns).unwrap();

        let loaded = store.load_transactions(&statement_id).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].amount, dec!(-150.00));
        assert_eq!(loaded[0].direction, Direction::Debit);
        assert_eq!(loaded[0].channel, Channel::Card);
        assert_eq!(loaded[0].tx_hash, txns[0].tx_hash);
        assert_eq!(loaded[1].counterparty_clean, "FIRMA XYZ");
    }

    #[test]
    fn test_duplicate_hash_rejected_per_statement() {
        let (store, _dir) = temp_store();
        let (_case, statement_id) = sample_statement(&store);

        let raw = vec![RawTransaction::new("2024-01-05".parse().unwrap(), dec!(-1.00))];
        let txns = normalize_transactions(&raw, &statement_id);
        store.save_transactions(&txns).unwrap();
        // Same tx again gets a fresh row id but the same hash.
        let again = normalize_transactions(&raw, &statement_id);
        assert!(store.save_transactions(&again).is_err());
    }

    #[test]
    fn test_find_by_pdf_hash() {
        let (store, _dir) = temp_store();
        let (_case, statement_id) = sample_statement(&store);
        assert_eq!(
            store.find_statement_by_pdf_hash("abc123").unwrap(),
            Some(statement_id)
        );
        assert_eq!(store.find_statement_by_pdf_hash("missing").unwrap(), None);
    }

    #[test]
    fn test_update_statement_field_whitelist() {
        let (store, _dir) = temp_store();
        let (_case, statement_id) = sample_statement(&store);
        assert!(store
            .update_statement_field(&statement_id, "account_holder", "JAN NOWAK")
            .unwrap());
        assert!(!store
            .update_statement_field(&statement_id, "pdf_hash", "forged")
            .unwrap());
    }

    #[test]
    fn test_account_profile_upsert() {
        let (store, _dir) = temp_store();
        store
            .upsert_account_profile("12345678901234567890123456", "JAN KOWALSKI", "ing")
            .unwrap();
        store
            .upsert_account_profile("12345678901234567890123456", "", "ing")
            .unwrap();
        assert_eq!(
            store
                .account_statement_count("12345678901234567890123456")
                .unwrap(),
            2
        );
        assert_eq!(store.account_statement_count("inne").unwrap(), 0);
    }

    #[test]
    fn test_case_delete_cascades_to_transactions() {
        let (store, _dir) = temp_store();
        let (case, statement_id) = sample_statement(&store);
        let raw = vec![RawTransaction::new("2024-01-05".parse().unwrap(), dec!(-1.00))];
        store
            .save_transactions(&normalize_transactions(&raw, &statement_id))
            .unwrap();

        store.delete_case(&case).unwrap();
        assert!(store.load_transactions(&statement_id).unwrap().is_empty());
    }
}
