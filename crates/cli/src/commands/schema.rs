//! Print the `shop` schema catalog.

use shopkeep_store::schema;

/// Print each table with its keys and outgoing foreign keys.
pub fn print() {
    #[allow(clippy::print_stdout)]
    for table in schema::tables() {
        println!("shop.{} (primary key: {})", table.name, table.primary_key.join(", "));
        for unique in table.unique {
            println!("  unique {unique}");
        }
        for check in table.checks {
            println!("  check  {check}");
        }
        for fk in table.foreign_keys {
            println!(
                "  {}: {} -> {} ON DELETE {}",
                fk.name, fk.column, fk.references, fk.on_delete
            );
        }
    }
}
