// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Pin creation and deletion.

use crate::db::PinStore;
use crate::error::{AppError, Result};
use crate::models::pin::{directions_url, round_coordinate};
use crate::models::{NewPin, Pin};
use crate::services::geocoding::Geocoder;
use crate::services::notices::{Notices, PIN_CREATE_FAILED};
use crate::services::session::{Session, SessionUser};
use crate::time_utils::now_rfc3339;
use std::sync::Arc;
use validator::Validate;

/// Creator (by uid) or the administrator (by exact email) may delete a pin.
pub fn can_delete(pin: &Pin, user: &SessionUser, admin_email: Option<&str>) -> bool {
    if pin.created_by_uid == user.uid() {
        return true;
    }
    matches!((admin_email, user.email()), (Some(admin), Some(email)) if admin == email)
}

#[derive(Clone)]
pub struct PinService {
    store: Arc<dyn PinStore>,
    session: Session,
    geocoder: Geocoder,
    notices: Notices,
    admin_email: Option<String>,
}

impl PinService {
    pub fn new(
        store: Arc<dyn PinStore>,
        session: Session,
        geocoder: Geocoder,
        notices: Notices,
        admin_email: Option<String>,
    ) -> Self {
        Self {
            store,
            session,
            geocoder,
            notices,
            admin_email,
        }
    }

    /// Drop a pin at a clicked coordinate.
    pub async fn create_pin(&self, input: NewPin) -> Result<Pin> {
        let user = self.session.require_user()?;

        if let Err(e) = input.validate() {
            let err = AppError::BadRequest(e.to_string());
            self.notices.report(&err);
            return Err(err);
        }

        let lat = round_coordinate(input.lat);
        let lng = round_coordinate(input.lng);
        let place_label = self.geocoder.place_label(lat, lng).await;

        let pin = Pin {
            id: None,
            lat,
            lng,
            note: input.note.trim().to_string(),
            created_by: user.creator_name(),
            created_by_email: user.email().map(str::to_string),
            created_by_uid: user.uid().to_string(),
            created_at: now_rfc3339(),
            place_label,
            directions_url: directions_url(lat, lng),
            is_free_count: 0,
            is_not_free_count: 0,
        };

        match self.store.create_pin(&pin).await {
            Ok(created) => {
                tracing::info!(pin_id = %created.doc_id(), lat, lng, uid = %user.uid(), "Pin created");
                Ok(created)
            }
            Err(e) => {
                tracing::error!(error = %e, lat, lng, "Failed to add pin");
                self.notices.error(PIN_CREATE_FAILED);
                Err(e)
            }
        }
    }

    pub async fn delete_pin(&self, pin_id: &str) -> Result<()> {
        let user = self.session.require_user()?;

        let pin = self
            .store
            .get_pin(pin_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Pin {}", pin_id)))?;

        if !can_delete(&pin, &user, self.admin_email.as_deref()) {
            return Err(AppError::Forbidden(format!(
                "{} cannot delete pin {}",
                user.uid(),
                pin_id
            )));
        }

        if let Err(e) = self.store.delete_pin(pin_id).await {
            self.notices.report(&e);
            return Err(e);
        }
        Ok(())
    }
}
