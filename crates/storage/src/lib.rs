pub mod db;
pub mod email_log;
pub mod history;
pub mod ledger;

pub use db::{connect, create_db, DbPool};
pub use email_log::{find_log, list_log, status_counts, upsert_log, StatusCount};
pub use history::{list_history, save_summary};
pub use ledger::{
    category_totals, clear_all, delete_entry, entries_for_reconciliation, get_entry,
    insert_entry, ledger_stats, list_entries, monthly_totals, update_entry, CategoryTotal,
    LedgerPage, LedgerQuery, LedgerStats, MonthlyTotal,
};
