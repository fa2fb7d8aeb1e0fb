pub mod invoice_items;
pub mod invoice_sequences;
pub mod invoices;
pub mod products;
