/*!
The `streamcsv` crate provides a streaming CSV reader and writer with serde
support and an optional spreadsheet dialect.

Reading is incremental: a `Reader` pulls bytes from any `std::io::Read`
through a fixed-size buffer, so records may be split across any number of
reads. Records need not have the same number of fields, blank lines are
skipped, and whitespace around unquoted fields is trimmed.

The spreadsheet dialect adds two tricks on top of plain CSV, both on the read
side and the write side:

* `="..."` wraps a field so a spreadsheet application keeps it as text. The
  writer uses it for fields with a leading `0` or with leading or trailing
  whitespace.
* `"0` inside a quoted field stands for a NUL byte.

# Example

This reads a table with a header row in the spreadsheet dialect, and writes
it back out.

```
use std::error::Error;

use serde::{Deserialize, Serialize};
use streamcsv::{ReaderBuilder, WriterBuilder};

#[derive(Debug, Deserialize, PartialEq, Serialize)]
struct Part {
    code: String,
    name: String,
    qty: u32,
}

# fn main() { example().unwrap(); }
fn example() -> Result<(), Box<dyn Error>> {
    let data = "\
code,name,qty
=\"0042\",\"bolt, hex\",100
=\"0007\",  washer  ,5
";
    let mut rdr = ReaderBuilder::new()
        .spreadsheet(true)
        .has_headers(true)
        .from_reader(data.as_bytes());
    let mut wtr = WriterBuilder::new()
        .spreadsheet(true)
        .has_headers(true)
        .from_writer(vec![]);
    for result in rdr.deserialize() {
        let part: Part = result?;
        wtr.serialize(part)?;
    }

    let out = String::from_utf8(wtr.into_inner()?)?;
    assert_eq!(out, "\
code,name,qty
=\"0042\",\"bolt, hex\",100
=\"0007\",washer,5
");
    Ok(())
}
```
*/

#![deny(missing_docs)]

pub use streamcsv_core::{Dialect, ParseError, ParseErrorKind, Position};

pub use crate::byte_record::{ByteRecord, ByteRecordIter};
pub use crate::deserializer::{DeserializeError, DeserializeErrorKind};
pub use crate::error::{Error, FromUtf8Error, Result, Utf8Error};
pub use crate::reader::{
    ByteRecordsIntoIter, ByteRecordsIter, DeserializeRecordsIntoIter,
    DeserializeRecordsIter, Reader, ReaderBuilder, StringRecordsIntoIter,
    StringRecordsIter,
};
pub use crate::string_record::{StringRecord, StringRecordIter};
pub use crate::writer::{Writer, WriterBuilder};

mod byte_record;
mod deserializer;
mod error;
mod reader;
mod serializer;
mod string_record;
mod writer;
