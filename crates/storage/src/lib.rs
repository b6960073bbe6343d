pub mod db;

pub use db::{
    account_amount_profile, create_db, insert_categorized, insert_invoice, most_frequent_account,
    open_invoices, DbPool, SqliteCandidateSource,
};
