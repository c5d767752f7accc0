use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::Connection;

#[inline]
/// Parse vector of floats from the bytes slice.
fn parse_embedding(bytes: &[u8]) -> anyhow::Result<Vec<f32>> {
    let n = bytes.len();

    if n % 4 != 0 {
        anyhow::bail!("Trying to query token embedding with different float type");
    }

    let mut embedding = Vec::with_capacity(n / 4);
    let mut be_bytes = [0; 4];

    let mut k = 0;

    while k < n {
        be_bytes.copy_from_slice(&bytes[k..k + 4]);

        embedding.push(f32::from_be_bytes(be_bytes));

        k += 4;
    }

    Ok(embedding)
}

#[derive(Debug, Clone)]
/// SQLite database for storing tokens and their trained embeddings.
pub struct Database {
    connection: Arc<Mutex<Connection>>
}

impl Database {
    /// Open database with given cache size.
    /// Negative number means sqlite pages (1024 bytes), positive - bytes.
    pub fn open(path: impl AsRef<Path>, cache_size: i64) -> rusqlite::Result<Self> {
        let connection = Connection::open(path)?;

        connection.execute(&format!("PRAGMA cache_size = {cache_size};"), ())?;

        connection.execute_batch("
            CREATE TABLE IF NOT EXISTS embeddings (
                token     TEXT NOT NULL,
                embedding BLOB NOT NULL,

                PRIMARY KEY (token)
            );
        ")?;

        Ok(Self {
            connection: Arc::new(Mutex::new(connection))
        })
    }

    /// Insert token embedding to the database, replacing the stored
    /// one if the token is already indexed.
    pub fn insert_embedding(&self, token: impl AsRef<str>, embedding: &[f32]) -> anyhow::Result<()> {
        let mut embedding_bytes = vec![0; embedding.len() * 4];

        for (i, float) in embedding.iter().enumerate() {
            embedding_bytes[i * 4..(i + 1) * 4].copy_from_slice(&float.to_be_bytes());
        }

        let connection = self.connection.lock()
            .map_err(|_| anyhow::anyhow!("Failed to lock sqlite connection"))?;

        connection.prepare_cached("INSERT OR REPLACE INTO embeddings (token, embedding) VALUES (?1, ?2)")?
            .execute((token.as_ref(), embedding_bytes))?;

        Ok(())
    }

    /// Query token embedding from the database.
    ///
    /// Guaranteed to return `Ok(None)` if token is not stored.
    pub fn query_embedding(&self, token: impl AsRef<str>) -> anyhow::Result<Option<Vec<f32>>> {
        let connection = self.connection.lock()
            .map_err(|_| anyhow::anyhow!("Failed to lock sqlite connection"))?;

        let mut query = connection.prepare_cached("SELECT embedding FROM embeddings WHERE token = ?1")?;

        let embedding = query.query_row([token.as_ref()], |row| row.get::<_, Vec<u8>>(0));

        let embedding = match embedding {
            Ok(embedding_bytes) => parse_embedding(&embedding_bytes)?,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
            Err(err) => anyhow::bail!(err)
        };

        Ok(Some(embedding))
    }

    /// Amount of stored token embeddings.
    pub fn len(&self) -> anyhow::Result<u64> {
        let connection = self.connection.lock()
            .map_err(|_| anyhow::anyhow!("Failed to lock sqlite connection"))?;

        let tokens = connection.prepare_cached("SELECT COUNT(token) FROM embeddings")?
            .query_row((), |row| row.get::<_, u64>(0))?;

        Ok(tokens)
    }

    #[inline]
    pub fn is_empty(&self) -> anyhow::Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Iterate over all tokens stored in the database, in lexicographic
    /// token order.
    ///
    /// Return amount of read tokens.
    pub fn for_each(&self, mut callback: impl FnMut(String, Vec<f32>) -> anyhow::Result<()>) -> anyhow::Result<u64> {
        let mut tokens = 0;

        let connection = self.connection.lock()
            .map_err(|_| anyhow::anyhow!("Failed to lock sqlite connection"))?;

        let mut query = connection.prepare_cached("
            SELECT token, embedding FROM embeddings
            ORDER BY token ASC
        ")?;

        query.query_map([], |row| {
            let token = row.get::<_, String>(0)?;
            let embedding = row.get::<_, Vec<u8>>(1)?;

            Ok((token, embedding))
        })?.try_for_each(|row| {
            let (token, embedding) = row?;

            tokens += 1;

            callback(token, parse_embedding(&embedding)?)
        })?;

        Ok(tokens)
    }
}

#[test]
fn test_embeddings_database() -> anyhow::Result<()> {
    let path = std::env::temp_dir()
        .join(format!("dipole-embeddings-test-{}.db", std::process::id()));

    let _ = std::fs::remove_file(&path);

    let db = Database::open(&path, 4096)?;

    assert!(db.is_empty()?);

    db.insert_embedding("hello", &[1.0, 2.0, 3.0])?;
    db.insert_embedding("world", &[1.0, 2.0, 4.0])?;

    assert_eq!(db.query_embedding("hello")?.as_deref(), Some([1.0, 2.0, 3.0].as_slice()));
    assert_eq!(db.query_embedding("world")?.as_deref(), Some([1.0, 2.0, 4.0].as_slice()));
    assert_eq!(db.query_embedding("unknown")?, None);

    assert_eq!(db.len()?, 2);

    // Publishing a token again replaces its stored embedding.
    db.insert_embedding("hello", &[5.0, 6.0, 7.0])?;

    assert_eq!(db.query_embedding("hello")?.as_deref(), Some([5.0, 6.0, 7.0].as_slice()));
    assert_eq!(db.len()?, 2);

    let mut tokens = Vec::new();

    let read = db.for_each(|token, embedding| {
        tokens.push((token, embedding));

        Ok(())
    })?;

    assert_eq!(read, 2);

    assert_eq!(tokens, &[
        (String::from("hello"), vec![5.0, 6.0, 7.0]),
        (String::from("world"), vec![1.0, 2.0, 4.0])
    ]);

    let _ = std::fs::remove_file(&path);

    Ok(())
}
