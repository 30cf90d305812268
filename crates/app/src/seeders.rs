//! Fixture data seeders
//!
//! `DatabaseSeeder` lays down what every Koel install has (the admin account,
//! the unknown artist/album placeholders, the media path setting).
//! `E2EDataSeeder` layers a deterministic library on top so the browser tests
//! have songs, albums, a playlist and favorites to look at.

use chrono::Utc;
use rusqlite::{params, Connection, Transaction};
use sha2::{Digest, Sha256};
use tracing::info;

use crate::db::Database;
use crate::{Error, Result};

/// Name and email of the seeded admin account
pub const ADMIN_NAME: &str = "Koel Admin";
pub const ADMIN_EMAIL: &str = "koel@example.com";
pub const ADMIN_PASSWORD: &str = "SoSecureK0el";

/// bcrypt hash (cost 10) of [`ADMIN_PASSWORD`], in the `$2y$` form Laravel writes
const ADMIN_PASSWORD_HASH: &str = "$2y$10$abcdefghijklmnopqrstuutZvFPvBEyyjYxkh70tmNzaLNsTnpBCm";

pub const UNKNOWN_ARTIST: &str = "Unknown Artist";
pub const UNKNOWN_ALBUM: &str = "Unknown Album";
pub const MEDIA_PATH: &str = "/tmp/koel-e2e/media";

/// Name of the seeder `db:seed` runs when no class is given
pub const DEFAULT_SEEDER: &str = "DatabaseSeeder";

/// Something `db:seed --class=<name>` can run
pub trait Seeder: Send + Sync {
    fn name(&self) -> &'static str;

    fn run(&self, tx: &Transaction<'_>) -> Result<()>;
}

/// Look up a seeder by class name
pub fn find(name: &str) -> Result<Box<dyn Seeder>> {
    match name {
        "DatabaseSeeder" => Ok(Box::new(DatabaseSeeder)),
        "E2EDataSeeder" => Ok(Box::new(E2EDataSeeder::default())),
        other => Err(Error::UnknownSeeder(other.to_string())),
    }
}

/// Run a seeder inside one transaction
pub fn seed(db: &Database, seeder: &dyn Seeder) -> Result<()> {
    let conn = db.connection();
    let mut conn = conn.lock();
    let tx = conn.transaction()?;
    seeder.run(&tx)?;
    tx.commit()?;

    info!("Seeded: {}", seeder.name());
    Ok(())
}

fn now() -> String {
    Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Default seed: admin account, placeholder artist/album, settings
pub struct DatabaseSeeder;

impl Seeder for DatabaseSeeder {
    fn name(&self) -> &'static str {
        "DatabaseSeeder"
    }

    fn run(&self, tx: &Transaction<'_>) -> Result<()> {
        let ts = now();

        tx.execute(
            "INSERT INTO artists (name, created_at, updated_at) VALUES (?1, ?2, ?2)",
            params![UNKNOWN_ARTIST, ts],
        )?;
        let artist_id = tx.last_insert_rowid();
        tx.execute(
            "INSERT INTO albums (artist_id, name, cover, created_at, updated_at) VALUES (?1, ?2, 'unknown-album.png', ?3, ?3)",
            params![artist_id, UNKNOWN_ALBUM, ts],
        )?;

        tx.execute(
            "INSERT INTO users (name, email, password, is_admin, created_at, updated_at) VALUES (?1, ?2, ?3, 1, ?4, ?4)",
            params![ADMIN_NAME, ADMIN_EMAIL, ADMIN_PASSWORD_HASH, ts],
        )?;

        tx.execute(
            "INSERT INTO settings (key, value) VALUES ('media_path', ?1)",
            params![serde_json::to_string(MEDIA_PATH)?],
        )?;

        Ok(())
    }
}

/// Library used by the browser tests
#[derive(Debug, Clone)]
pub struct E2EDataSeeder {
    pub artists: usize,
    pub albums_per_artist: usize,
    pub songs_per_album: usize,
    /// How many songs (in insertion order) the admin has liked
    pub liked_songs: usize,
    /// How many songs go into the seeded playlist
    pub playlist_songs: usize,
}

impl Default for E2EDataSeeder {
    fn default() -> Self {
        Self {
            artists: 3,
            albums_per_artist: 2,
            songs_per_album: 10,
            liked_songs: 3,
            playlist_songs: 5,
        }
    }
}

impl E2EDataSeeder {
    pub fn total_songs(&self) -> usize {
        self.artists * self.albums_per_artist * self.songs_per_album
    }
}

/// Koel keys songs by a digest of their file path
pub fn song_id(path: &str) -> String {
    let digest = Sha256::digest(path.as_bytes());
    hex::encode(&digest[..16])
}

fn admin_id(conn: &Connection) -> Result<i64> {
    conn.query_row(
        "SELECT id FROM users WHERE email = ?1",
        params![ADMIN_EMAIL],
        |row| row.get(0),
    )
    .map_err(|_| Error::Command {
        command: "db:seed --class=E2EDataSeeder".to_string(),
        reason: format!("admin user {} missing; run DatabaseSeeder first", ADMIN_EMAIL),
    })
}

impl Seeder for E2EDataSeeder {
    fn name(&self) -> &'static str {
        "E2EDataSeeder"
    }

    fn run(&self, tx: &Transaction<'_>) -> Result<()> {
        let user_id = admin_id(tx)?;
        let ts = now();
        let mut song_ids = Vec::with_capacity(self.total_songs());

        for a in 1..=self.artists {
            let artist = format!("Artist {}", a);
            tx.execute(
                "INSERT INTO artists (name, created_at, updated_at) VALUES (?1, ?2, ?2)",
                params![artist, ts],
            )?;
            let artist_id = tx.last_insert_rowid();

            for b in 1..=self.albums_per_artist {
                let album = format!("Album {}.{}", a, b);
                tx.execute(
                    "INSERT INTO albums (artist_id, name, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)",
                    params![artist_id, album, ts],
                )?;
                let album_id = tx.last_insert_rowid();

                for track in 1..=self.songs_per_album {
                    let path = format!("{}/{}/{}/{:02}.mp3", MEDIA_PATH, artist, album, track);
                    let id = song_id(&path);
                    tx.execute(
                        "INSERT INTO songs (id, album_id, title, length, track, path, mtime, created_at, updated_at) \
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
                        params![
                            id,
                            album_id,
                            format!("Song {}.{}.{}", a, b, track),
                            180.0 + track as f64,
                            track as i64,
                            path,
                            Utc::now().timestamp(),
                            ts
                        ],
                    )?;
                    song_ids.push(id);
                }
            }
        }

        for id in song_ids.iter().take(self.liked_songs) {
            tx.execute(
                "INSERT INTO interactions (user_id, song_id, liked, play_count, created_at, updated_at) VALUES (?1, ?2, 1, 1, ?3, ?3)",
                params![user_id, id, ts],
            )?;
        }

        tx.execute(
            "INSERT INTO playlists (user_id, name, created_at, updated_at) VALUES (?1, 'Playlist 1', ?2, ?2)",
            params![user_id, ts],
        )?;
        let playlist_id = tx.last_insert_rowid();
        for id in song_ids.iter().take(self.playlist_songs) {
            tx.execute(
                "INSERT INTO playlist_song (playlist_id, song_id) VALUES (?1, ?2)",
                params![playlist_id, id],
            )?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations::Migrator;

    fn migrated() -> Database {
        let db = Database::open_memory().unwrap();
        Migrator::new(&db).run().unwrap();
        db
    }

    #[test]
    fn test_find_known_and_unknown() {
        assert_eq!(find("DatabaseSeeder").unwrap().name(), "DatabaseSeeder");
        assert_eq!(find("E2EDataSeeder").unwrap().name(), "E2EDataSeeder");
        assert!(matches!(find("FooSeeder"), Err(Error::UnknownSeeder(_))));
    }

    #[test]
    fn test_default_seed_creates_admin() {
        let db = migrated();
        seed(&db, &DatabaseSeeder).unwrap();

        let conn = db.connection();
        let conn = conn.lock();
        let (name, is_admin): (String, i64) = conn
            .query_row(
                "SELECT name, is_admin FROM users WHERE email = ?1",
                params![ADMIN_EMAIL],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(name, ADMIN_NAME);
        assert_eq!(is_admin, 1);
    }

    #[test]
    fn test_e2e_seed_requires_admin() {
        let db = migrated();
        let err = seed(&db, &E2EDataSeeder::default()).unwrap_err();
        assert!(matches!(err, Error::Command { .. }));
        assert_eq!(db.count("songs").unwrap(), 0);
    }

    #[test]
    fn test_e2e_seed_layers_on_default() {
        let db = migrated();
        let seeder = E2EDataSeeder::default();
        seed(&db, &DatabaseSeeder).unwrap();
        seed(&db, &seeder).unwrap();

        assert_eq!(db.count("songs").unwrap(), seeder.total_songs() as i64);
        assert_eq!(db.count("artists").unwrap(), seeder.artists as i64 + 1);
        assert_eq!(db.count("interactions").unwrap(), seeder.liked_songs as i64);
        assert_eq!(db.count("playlist_song").unwrap(), seeder.playlist_songs as i64);
    }

    #[test]
    fn test_song_id_is_stable() {
        let id = song_id("/music/a.mp3");
        assert_eq!(id.len(), 32);
        assert_eq!(id, song_id("/music/a.mp3"));
        assert_ne!(id, song_id("/music/b.mp3"));
    }
}
