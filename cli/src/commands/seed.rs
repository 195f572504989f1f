use anyhow::Result;
use chrono::Utc;

use fitlog_core::Storage;
use fitlog_core::seed::{DEMO_USERNAME, seed_demo_data};

pub(crate) fn cmd_seed(store: &dyn Storage, json: bool) -> Result<()> {
    let inserted = seed_demo_data(store, Utc::now())?;

    if json {
        println!("{}", serde_json::json!({ "seeded": inserted }));
    } else if inserted {
        println!("Seeded demo data for user '{DEMO_USERNAME}'");
    } else {
        println!("Store already has users; nothing seeded");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fitlog_core::memory::MemStorage;

    #[test]
    fn test_seed_twice() {
        let store = MemStorage::new();
        cmd_seed(&store, true).unwrap();
        cmd_seed(&store, false).unwrap();
        assert_eq!(store.count_users().unwrap(), 1);
    }
}
