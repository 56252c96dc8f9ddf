//! Asynchronous CSV reader with batch interface
//!
//! Generic over the record type so one reader serves every seed file.
//!
//! ```text
//! tokio File → compat → AsyncReader<T> → batches of T
//! ```

use csv_async::AsyncReaderBuilder;
use futures::io::AsyncRead;
use futures::stream::StreamExt;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use std::path::Path;
use tokio_util::compat::{Compat, TokioAsyncReadCompatExt};

/// Asynchronous CSV reader
///
/// Rows that fail to deserialize are logged and skipped.
pub struct AsyncReader<R: AsyncRead + Unpin, T> {
    csv_reader: csv_async::AsyncDeserializer<R>,
    _record: PhantomData<fn() -> T>,
}

impl<R, T> AsyncReader<R, T>
where
    R: AsyncRead + Unpin + Send + 'static,
    T: DeserializeOwned + 'static,
{
    pub fn new(reader: R) -> Self {
        let csv_reader = AsyncReaderBuilder::new()
            .flexible(true)
            .trim(csv_async::Trim::All)
            .create_deserializer(reader);

        Self {
            csv_reader,
            _record: PhantomData,
        }
    }

    /// Read up to `batch_size` records; an empty batch means end of input
    pub async fn read_batch(&mut self, batch_size: usize) -> Vec<T> {
        let mut batch = Vec::with_capacity(batch_size);
        let mut records = self.csv_reader.deserialize::<T>();

        while batch.len() < batch_size {
            match records.next().await {
                Some(Ok(record)) => batch.push(record),
                Some(Err(e)) => tracing::warn!(error = %e, "skipping unreadable CSV row"),
                None => break,
            }
        }

        batch
    }

    /// Read every remaining record
    pub async fn read_all(&mut self, batch_size: usize) -> Vec<T> {
        let mut all = Vec::new();
        loop {
            let batch = self.read_batch(batch_size).await;
            if batch.is_empty() {
                return all;
            }
            all.extend(batch);
        }
    }
}

impl<T> AsyncReader<Compat<tokio::fs::File>, T>
where
    T: DeserializeOwned + 'static,
{
    /// Open a CSV file for reading
    pub async fn open(path: &Path) -> std::io::Result<Self> {
        let file = tokio::fs::File::open(path).await?;
        Ok(Self::new(file.compat()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::csv_format::{CsvAccount, CsvRate};
    use futures::io::Cursor;
    use rust_decimal::Decimal;

    #[tokio::test]
    async fn test_read_batch() {
        let csv_content = "id,client,currency,balance\n1,1,KRW,100.0\n2,1,USD,50.0\n3,2,KRW,200\n";
        let mut reader = AsyncReader::<_, CsvAccount>::new(Cursor::new(csv_content.as_bytes()));

        let batch = reader.read_batch(2).await;
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].id, 1);
        assert_eq!(batch[1].currency, "USD");

        let batch = reader.read_batch(2).await;
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].client, 2);

        assert!(reader.read_batch(2).await.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_rows_are_skipped() {
        let csv_content = "currency,rate\nUSD,not_a_number\nJPY,9.1\n";
        let mut reader = AsyncReader::<_, CsvRate>::new(Cursor::new(csv_content.as_bytes()));

        let records = reader.read_all(10).await;

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].rate, Decimal::new(91, 1));
    }

    #[tokio::test]
    async fn test_whitespace_and_optional_columns() {
        let csv_content = "id,client,currency,balance,state\n  1 , 7 , KRW , 10.5 , \n2,7,KRW,1,closed\n";
        let mut reader = AsyncReader::<_, CsvAccount>::new(Cursor::new(csv_content.as_bytes()));

        let records = reader.read_all(10).await;

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].state, None);
        assert_eq!(records[0].balance, Decimal::new(105, 1));
        assert_eq!(records[1].state, Some(crate::types::AccountState::Closed));
    }

    #[tokio::test]
    async fn test_open_missing_file_fails() {
        let result = AsyncReader::<_, CsvRate>::open(Path::new("does/not/exist.csv")).await;
        assert!(result.is_err());
    }
}
