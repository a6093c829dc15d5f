//! Query-result backend messages: RowDescription, DataRow, CommandComplete,
//! EmptyQueryResponse.

use crate::protocol::codec::MessageBuilder;
use crate::protocol::types::{FormatCode, Oid};

use super::msg_type;

/// One column's metadata for a `RowDescription` frame.
#[derive(Debug, Clone)]
pub struct FieldDescriptor<'a> {
    pub name: &'a str,
    /// OID of the table the column comes from, or 0 if not a simple column reference.
    pub table_oid: u32,
    /// Column's attribute number in that table, or 0.
    pub column_id: i16,
    pub type_oid: Oid,
    /// Negative values are variable-length type markers; see pg_type.typlen.
    pub type_size: i16,
    /// Type-specific modifier (e.g. varchar length), or -1.
    pub type_modifier: i32,
    pub format: FormatCode,
}

/// Write a `RowDescription` message.
pub fn write_row_description(buf: &mut Vec<u8>, fields: &[FieldDescriptor<'_>]) {
    let mut msg = MessageBuilder::new(buf, msg_type::ROW_DESCRIPTION);
    msg.write_i16(fields.len() as i16);
    for field in fields {
        msg.write_cstr(field.name);
        msg.write_u32(field.table_oid);
        msg.write_i16(field.column_id);
        msg.write_u32(field.type_oid);
        msg.write_i16(field.type_size);
        msg.write_i32(field.type_modifier);
        msg.write_i16(field.format as i16);
    }
    msg.finish();
}

/// Write a `DataRow` message. `None` encodes SQL NULL (length = -1, §4.2).
pub fn write_data_row(buf: &mut Vec<u8>, columns: &[Option<&[u8]>]) {
    let mut msg = MessageBuilder::new(buf, msg_type::DATA_ROW);
    msg.write_i16(columns.len() as i16);
    for column in columns {
        match column {
            Some(bytes) => {
                msg.write_i32(bytes.len() as i32);
                msg.write_bytes(bytes);
            }
            None => msg.write_i32(-1),
        }
    }
    msg.finish();
}

/// Write a `CommandComplete` message with the given command tag
/// (e.g. `"SELECT 1"`, `"INSERT 0 1"`, `"COPY 2"`).
pub fn write_command_complete(buf: &mut Vec<u8>, tag: &str) {
    let mut msg = MessageBuilder::new(buf, msg_type::COMMAND_COMPLETE);
    msg.write_cstr(tag);
    msg.finish();
}

/// Build the standard command tag for a given statement category and row count.
pub fn command_tag(category: crate::classifier::Category, rows_affected: u64) -> String {
    use crate::classifier::Category;
    match category {
        Category::Select | Category::LocalIntercept => format!("SELECT {rows_affected}"),
        Category::Insert => format!("INSERT 0 {rows_affected}"),
        Category::Update => format!("UPDATE {rows_affected}"),
        Category::Delete => format!("DELETE {rows_affected}"),
        Category::Copy => format!("COPY {rows_affected}"),
        _ => format!("{rows_affected}"),
    }
}

/// Write an `EmptyQueryResponse` message, sent for a Query string with no
/// statements at all.
pub fn write_empty_query_response(buf: &mut Vec<u8>) {
    let msg = MessageBuilder::new(buf, msg_type::EMPTY_QUERY_RESPONSE);
    msg.finish();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_row_with_null() {
        let mut buf = Vec::new();
        write_data_row(&mut buf, &[Some(b"hi"), None]);
        assert_eq!(buf[0], b'D');
        // numColumns(2) + col0 len(2)+"hi" + col1 len(-1)
        let expected_len = 4 + 2 + (4 + 2) + 4;
        let len = i32::from_be_bytes([buf[1], buf[2], buf[3], buf[4]]);
        assert_eq!(len as usize, expected_len);
    }

    #[test]
    fn test_command_complete() {
        let mut buf = Vec::new();
        write_command_complete(&mut buf, "SELECT 1");
        assert_eq!(buf[0], b'C');
        assert!(buf.ends_with(b"SELECT 1\0"));
    }
}
