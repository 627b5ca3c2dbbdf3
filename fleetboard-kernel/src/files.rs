/**
 * FILE DISTRIBUTOR - Canal fichiers opérateur → fleet
 *
 * RÔLE : Queues de notification par device (noms en attente, sans doublon)
 * + blobs sur disque par (device_id, filename). La queue modélise la
 * notification, pas le stockage : consommer un nom ne supprime pas le blob.
 *
 * CONCURRENCE : I/O blob en dehors du verrou de queue ; la mutation de queue
 * est une courte section critique parking_lot.
 */

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs;

use crate::state::{new_state, Shared};

#[derive(Debug, Error)]
pub enum FileDistError {
    #[error("No active devices found to send the file to.")]
    NoActiveRecipients,
    #[error("File '{filename}' not found for device '{device_id}'")]
    BlobMissing { device_id: String, filename: String },
    #[error("file storage error: {0}")]
    Io(#[from] std::io::Error),
}

/// Queues d'attente par device. Insertion ordonnée, sémantique d'ensemble
/// par nom de fichier.
type PendingMap = HashMap<String, Vec<String>>;

pub struct FileDistributor {
    upload_dir: PathBuf,
    pending: Shared<PendingMap>,
}

impl FileDistributor {
    pub fn new(upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
            pending: new_state(HashMap::new()),
        }
    }

    fn blob_path(&self, device_id: &str, filename: &str) -> PathBuf {
        self.upload_dir.join(device_id).join(filename)
    }

    async fn write_blob(
        &self,
        device_id: &str,
        filename: &str,
        bytes: &[u8],
    ) -> Result<(), FileDistError> {
        let dir = self.upload_dir.join(device_id);
        fs::create_dir_all(&dir).await?;
        fs::write(dir.join(filename), bytes).await?;
        Ok(())
    }

    /// Insertion idempotente : un nom déjà en attente n'est pas dupliqué.
    fn enqueue(&self, device_id: &str, filename: &str) {
        let mut pending = self.pending.lock();
        let queue = pending.entry(device_id.to_string()).or_default();
        if !queue.iter().any(|name| name == filename) {
            queue.push(filename.to_string());
        }
    }

    /// Push ciblé : écrit le blob (re-push = écrasement par le contenu plus
    /// récent) puis notifie le device.
    pub async fn push_to_device(
        &self,
        device_id: &str,
        filename: &str,
        bytes: &[u8],
    ) -> Result<(), FileDistError> {
        self.write_blob(device_id, filename, bytes).await?;
        self.enqueue(device_id, filename);
        Ok(())
    }

    /// Broadcast vers l'ensemble actif figé par l'appelant. Ensemble vide →
    /// erreur NotFound sans aucune écriture ; les devices devenant actifs
    /// juste après ne sont pas rattrapés.
    pub async fn push_to_active(
        &self,
        filename: &str,
        bytes: &[u8],
        recipients: &[String],
    ) -> Result<usize, FileDistError> {
        if recipients.is_empty() {
            return Err(FileDistError::NoActiveRecipients);
        }
        for device_id in recipients {
            self.write_blob(device_id, filename, bytes).await?;
            self.enqueue(device_id, filename);
        }
        Ok(recipients.len())
    }

    /// Noms en attente, dans l'ordre de push ; vide pour un device inconnu.
    pub fn list_pending(&self, device_id: &str) -> Vec<String> {
        self.pending
            .lock()
            .get(device_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Téléchargement : le blob est servi qu'il soit en attente ou non ;
    /// s'il figure dans la queue, il en sort au premier download. Blob
    /// absent → NotFound.
    pub async fn consume(
        &self,
        device_id: &str,
        filename: &str,
    ) -> Result<Vec<u8>, FileDistError> {
        let path = self.blob_path(device_id, filename);
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(FileDistError::BlobMissing {
                    device_id: device_id.to_string(),
                    filename: filename.to_string(),
                })
            }
            Err(e) => return Err(e.into()),
        };

        let mut pending = self.pending.lock();
        if let Some(queue) = pending.get_mut(device_id) {
            queue.retain(|name| name != filename);
        }
        Ok(bytes)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().values().map(Vec::len).sum()
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }
}
