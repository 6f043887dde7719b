use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::models::{
    validate_slot_window, windows_overlap, AvailabilitySlot, CreateAvailabilitySlot, UpdateAvailabilitySlot,
};

const SLOT_COLUMNS: &str = "id, trainer_id, day_of_week, start_time, end_time, is_active, created_at, updated_at";

#[derive(Clone)]
pub struct AvailabilityService {
    db: PgPool,
}

impl AvailabilityService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list_for_trainer(&self, trainer_id: Uuid, active_only: bool) -> Result<Vec<AvailabilitySlot>, ServiceError> {
        let slots = sqlx::query_as::<_, AvailabilitySlot>(&format!(
            "SELECT {SLOT_COLUMNS} FROM availability_slots
             WHERE trainer_id = $1 AND ($2 = FALSE OR is_active)
             ORDER BY day_of_week, start_time"
        ))
        .bind(trainer_id)
        .bind(active_only)
        .fetch_all(&self.db)
        .await?;

        Ok(slots)
    }

    pub async fn create(&self, trainer_id: Uuid, request: CreateAvailabilitySlot) -> Result<AvailabilitySlot, ServiceError> {
        validate_slot_window(request.day_of_week, request.start_time, request.end_time)
            .map_err(ServiceError::from_validation)?;

        let mut tx = self.db.begin().await?;
        lock_trainer(&mut tx, trainer_id).await?;

        let existing = sqlx::query_as::<_, AvailabilitySlot>(&format!(
            "SELECT {SLOT_COLUMNS} FROM availability_slots
             WHERE trainer_id = $1 AND day_of_week = $2 AND is_active"
        ))
        .bind(trainer_id)
        .bind(request.day_of_week)
        .fetch_all(&mut *tx)
        .await?;

        ensure_no_overlap(&existing, None, request.start_time, request.end_time)?;

        let slot = sqlx::query_as::<_, AvailabilitySlot>(&format!(
            "INSERT INTO availability_slots (trainer_id, day_of_week, start_time, end_time)
             VALUES ($1, $2, $3, $4)
             RETURNING {SLOT_COLUMNS}"
        ))
        .bind(trainer_id)
        .bind(request.day_of_week)
        .bind(request.start_time)
        .bind(request.end_time)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(slot)
    }

    pub async fn update(
        &self,
        trainer_id: Uuid,
        slot_id: Uuid,
        request: UpdateAvailabilitySlot,
    ) -> Result<AvailabilitySlot, ServiceError> {
        let mut tx = self.db.begin().await?;
        lock_trainer(&mut tx, trainer_id).await?;

        let current = sqlx::query_as::<_, AvailabilitySlot>(&format!(
            "SELECT {SLOT_COLUMNS} FROM availability_slots WHERE id = $1 AND trainer_id = $2"
        ))
        .bind(slot_id)
        .bind(trainer_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(ServiceError::NotFound("Availability slot"))?;

        let day = request.day_of_week.unwrap_or(current.day_of_week);
        let start = request.start_time.unwrap_or(current.start_time);
        let end = request.end_time.unwrap_or(current.end_time);
        let is_active = request.is_active.unwrap_or(current.is_active);

        validate_slot_window(day, start, end).map_err(ServiceError::from_validation)?;

        if is_active {
            let same_day = sqlx::query_as::<_, AvailabilitySlot>(&format!(
                "SELECT {SLOT_COLUMNS} FROM availability_slots
                 WHERE trainer_id = $1 AND day_of_week = $2 AND is_active"
            ))
            .bind(trainer_id)
            .bind(day)
            .fetch_all(&mut *tx)
            .await?;

            ensure_no_overlap(&same_day, Some(slot_id), start, end)?;
        }

        let slot = sqlx::query_as::<_, AvailabilitySlot>(&format!(
            "UPDATE availability_slots
             SET day_of_week = $2, start_time = $3, end_time = $4, is_active = $5, updated_at = NOW()
             WHERE id = $1
             RETURNING {SLOT_COLUMNS}"
        ))
        .bind(slot_id)
        .bind(day)
        .bind(start)
        .bind(end)
        .bind(is_active)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(slot)
    }

    pub async fn delete(&self, trainer_id: Uuid, slot_id: Uuid) -> Result<(), ServiceError> {
        let result = sqlx::query("DELETE FROM availability_slots WHERE id = $1 AND trainer_id = $2")
            .bind(slot_id)
            .bind(trainer_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ServiceError::NotFound("Availability slot"));
        }
        Ok(())
    }
}

// Same lock the booking flow takes, so slot edits and bookings for one trainer serialize
async fn lock_trainer(tx: &mut sqlx::Transaction<'_, sqlx::Postgres>, trainer_id: Uuid) -> Result<(), ServiceError> {
    sqlx::query_scalar::<_, Uuid>("SELECT id FROM trainer_profiles WHERE id = $1 FOR UPDATE")
        .bind(trainer_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(ServiceError::NotFound("Trainer profile"))?;
    Ok(())
}

fn ensure_no_overlap(
    existing: &[AvailabilitySlot],
    ignore: Option<Uuid>,
    start: chrono::NaiveTime,
    end: chrono::NaiveTime,
) -> Result<(), ServiceError> {
    let clash = existing
        .iter()
        .filter(|slot| Some(slot.id) != ignore)
        .find(|slot| windows_overlap(slot.start_time, slot.end_time, start, end));

    match clash {
        Some(slot) => Err(ServiceError::conflict(format!(
            "overlaps existing slot {}-{}",
            slot.start_time.format("%H:%M"),
            slot.end_time.format("%H:%M")
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::{NaiveTime, Utc};

    fn t(h: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, 0, 0).unwrap()
    }

    fn slot(start: u32, end: u32) -> AvailabilitySlot {
        AvailabilitySlot {
            id: Uuid::new_v4(),
            trainer_id: Uuid::new_v4(),
            day_of_week: 2,
            start_time: t(start),
            end_time: t(end),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_adjacent_slots_allowed() {
        let existing = vec![slot(9, 12)];
        assert!(ensure_no_overlap(&existing, None, t(12), t(14)).is_ok());
        assert!(ensure_no_overlap(&existing, None, t(7), t(9)).is_ok());
    }

    #[test]
    fn test_overlapping_slot_rejected() {
        let existing = vec![slot(9, 12)];
        assert_matches!(
            ensure_no_overlap(&existing, None, t(11), t(13)),
            Err(ServiceError::Conflict(_))
        );
    }

    #[test]
    fn test_slot_does_not_clash_with_itself() {
        let existing = vec![slot(9, 12)];
        let id = existing[0].id;
        assert!(ensure_no_overlap(&existing, Some(id), t(10), t(13)).is_ok());
    }
}
