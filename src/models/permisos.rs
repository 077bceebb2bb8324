// src/models/permisos.rs

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    common::error::{AppError, Entity},
    models::validation::not_blank,
};

// --- ENUMS ---

// Os nomes em espanhol do sistema antigo continuam aceitos na entrada
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "permit_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PermitStatus {
    #[serde(alias = "SOLICITADO")]
    Pending,
    #[serde(alias = "APROBADO")]
    Approved,
    #[serde(alias = "RECHAZADO")]
    Rejected,
    #[serde(alias = "VENCIDO")]
    Expired,
    #[serde(alias = "CANCELADO")]
    Cancelled,
}

impl PermitStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PermitStatus::Pending => "PENDING",
            PermitStatus::Approved => "APPROVED",
            PermitStatus::Rejected => "REJECTED",
            PermitStatus::Expired => "EXPIRED",
            PermitStatus::Cancelled => "CANCELLED",
        }
    }

    /// PENDING -> APPROVED | REJECTED | CANCELLED
    /// APPROVED -> EXPIRED | CANCELLED
    pub fn can_transition_to(self, next: PermitStatus) -> bool {
        matches!(
            (self, next),
            (
                PermitStatus::Pending,
                PermitStatus::Approved | PermitStatus::Rejected | PermitStatus::Cancelled
            ) | (
                PermitStatus::Approved,
                PermitStatus::Expired | PermitStatus::Cancelled
            )
        )
    }
}

impl fmt::Display for PermitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- COMERCIANTE ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Merchant {
    pub id: i64,
    #[serde(rename = "nombre")]
    #[schema(example = "Ana Pérez")]
    pub name: String,
    #[serde(rename = "cedula")]
    #[schema(example = "123456789")]
    pub national_id: String,
    #[schema(example = "ana@correo.com")]
    pub email: String,
    #[serde(rename = "telefono")]
    #[schema(example = "3001234567")]
    pub phone: String,
    // Comerciantes nunca são apagados, apenas desativados
    #[serde(rename = "activo")]
    pub active: bool,
    #[serde(rename = "fecha_registro")]
    pub registered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct NewMerchant {
    #[serde(rename = "nombre")]
    #[validate(custom(function = "not_blank"))]
    #[schema(example = "Ana Pérez")]
    pub name: String,

    #[serde(rename = "cedula")]
    #[validate(custom(function = "not_blank"))]
    #[schema(example = "123456789")]
    pub national_id: String,

    #[validate(email(message = "invalid_email"))]
    #[schema(example = "ana@correo.com")]
    pub email: String,

    #[serde(rename = "telefono")]
    #[validate(custom(function = "not_blank"))]
    #[schema(example = "3001234567")]
    pub phone: String,
}

/// Atualização parcial: só os campos presentes são alterados.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct MerchantChanges {
    #[serde(rename = "nombre")]
    #[validate(custom(function = "not_blank"))]
    pub name: Option<String>,

    #[validate(email(message = "invalid_email"))]
    pub email: Option<String>,

    #[serde(rename = "telefono")]
    #[validate(custom(function = "not_blank"))]
    pub phone: Option<String>,

    #[serde(rename = "activo")]
    pub active: Option<bool>,
}

impl Merchant {
    pub fn apply_changes(&mut self, changes: &MerchantChanges) {
        if let Some(name) = &changes.name {
            self.name = name.clone();
        }
        if let Some(email) = &changes.email {
            self.email = email.clone();
        }
        if let Some(phone) = &changes.phone {
            self.phone = phone.clone();
        }
        if let Some(active) = changes.active {
            self.active = active;
        }
    }
}

// --- PUESTO ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Stall {
    pub id: i64,
    #[serde(rename = "nombre")]
    #[schema(example = "Puesto 12")]
    pub name: String,
    #[serde(rename = "descripcion")]
    #[schema(example = "Venta de fritos")]
    pub description: String,
    #[serde(rename = "ubicacion")]
    #[schema(example = "Vía 40, costado norte")]
    pub location: String,
    #[serde(rename = "fecha_creacion")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct NewStall {
    #[serde(rename = "nombre")]
    #[validate(custom(function = "not_blank"))]
    #[schema(example = "Puesto 12")]
    pub name: String,

    #[serde(rename = "descripcion", default)]
    pub description: String,

    #[serde(rename = "ubicacion", default)]
    pub location: String,
}

// --- PERMISO ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Permit {
    pub id: i64,
    #[serde(rename = "comerciante_id")]
    pub merchant_id: i64,
    #[serde(rename = "puesto_id")]
    pub stall_id: i64,
    #[serde(rename = "estado")]
    pub status: PermitStatus,
    #[serde(rename = "fecha_inicio")]
    pub start_date: DateTime<Utc>,
    #[serde(rename = "fecha_fin")]
    pub end_date: DateTime<Utc>,
    #[serde(rename = "motivo_rechazo")]
    pub rejection_reason: Option<String>,
    #[serde(rename = "fecha_solicitud")]
    pub requested_at: DateTime<Utc>,
    #[serde(rename = "fecha_actualizacion")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Permit {
    /// Intervalos fechados: compartilhar um único instante já é sobreposição.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start_date <= end && start <= self.end_date
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status == PermitStatus::Approved && self.end_date < now
    }

    /// Valida a mudança de estado. `stall_permits` são os permisos do mesmo
    /// puesto, consultados sob bloqueio pelo adaptador.
    pub fn check_transition<'a, I>(
        &self,
        change: &PermitTransition,
        stall_permits: I,
    ) -> Result<(), AppError>
    where
        I: IntoIterator<Item = &'a Permit>,
    {
        if !self.status.can_transition_to(change.status) {
            return Err(AppError::InvalidTransition {
                from: self.status,
                to: change.status,
            });
        }

        if change.rejection_reason.is_some() && change.status != PermitStatus::Rejected {
            return Err(AppError::InvalidField {
                field: "motivo_rechazo",
                code: "only_with_rejected",
            });
        }

        if change.status == PermitStatus::Approved {
            let conflict =
                find_overlap(stall_permits, self.start_date, self.end_date, Some(self.id));
            if let Some(conflict) = conflict {
                return Err(AppError::Overlap {
                    stall_id: self.stall_id,
                    conflicting_permit_id: conflict.id,
                });
            }
        }

        Ok(())
    }
}

impl Merchant {
    pub fn ensure_active(&self) -> Result<(), AppError> {
        if !self.active {
            return Err(AppError::InvalidField {
                field: "comerciante_id",
                code: "inactive_merchant",
            });
        }
        Ok(())
    }
}

/// Primeiro permiso APROVADO que cruza o intervalo, ignorando `exclude`.
pub fn find_overlap<'a, I>(
    permits: I,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    exclude: Option<i64>,
) -> Option<&'a Permit>
where
    I: IntoIterator<Item = &'a Permit>,
{
    permits.into_iter().find(|p| {
        p.status == PermitStatus::Approved && Some(p.id) != exclude && p.overlaps(start, end)
    })
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct NewPermit {
    #[serde(rename = "comerciante_id")]
    #[schema(example = 1)]
    pub merchant_id: i64,

    #[serde(rename = "puesto_id")]
    #[schema(example = 1)]
    pub stall_id: i64,

    #[serde(rename = "fecha_inicio", deserialize_with = "deserialize_start")]
    #[schema(example = "2027-02-26")]
    pub start_date: DateTime<Utc>,

    #[serde(rename = "fecha_fin", deserialize_with = "deserialize_end")]
    #[schema(example = "2027-03-01")]
    pub end_date: DateTime<Utc>,
}

impl NewPermit {
    pub fn check_range(&self) -> Result<(), AppError> {
        if self.start_date > self.end_date {
            return Err(AppError::InvalidField {
                field: "fecha_fin",
                code: "before_start",
            });
        }
        Ok(())
    }

    /// Regras do pedido que dependem do estado: comerciante ativo e puesto
    /// sem permiso aprovado no mesmo período.
    pub fn check_against<'a, I>(
        &self,
        merchant: &Merchant,
        stall_permits: I,
    ) -> Result<(), AppError>
    where
        I: IntoIterator<Item = &'a Permit>,
    {
        merchant.ensure_active()?;
        if let Some(conflict) = find_overlap(stall_permits, self.start_date, self.end_date, None) {
            return Err(AppError::Overlap {
                stall_id: self.stall_id,
                conflicting_permit_id: conflict.id,
            });
        }
        Ok(())
    }

    pub fn merchant_not_found(&self) -> AppError {
        AppError::NotFound {
            entity: Entity::Merchant,
            id: self.merchant_id,
        }
    }

    pub fn stall_not_found(&self) -> AppError {
        AppError::NotFound {
            entity: Entity::Stall,
            id: self.stall_id,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct PermitTransition {
    #[serde(rename = "estado")]
    #[schema(example = "APPROVED")]
    pub status: PermitStatus,

    #[serde(rename = "motivo_rechazo")]
    #[validate(custom(function = "not_blank"))]
    pub rejection_reason: Option<String>,
}

// --- DATAS FLEXÍVEIS ---
// O formulário manda `YYYY-MM-DD` (input type="date"); integrações mandam RFC 3339.

fn parse_datetime(raw: &str, end_of_day: bool) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    const NAIVE_FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
    ];
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }

    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
    let time = if end_of_day {
        NaiveTime::from_hms_opt(23, 59, 59)?
    } else {
        NaiveTime::from_hms_opt(0, 0, 0)?
    };
    Some(date.and_time(time).and_utc())
}

fn deserialize_flexible<'de, D>(
    deserializer: D,
    end_of_day: bool,
) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_datetime(raw.trim(), end_of_day)
        .ok_or_else(|| serde::de::Error::custom(format!("data inválida: '{}'", raw)))
}

fn deserialize_start<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    deserialize_flexible(deserializer, false)
}

fn deserialize_end<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    deserialize_flexible(deserializer, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2027, 2, day, 0, 0, 0).unwrap()
    }

    fn permit(id: i64, status: PermitStatus, start: u32, end: u32) -> Permit {
        Permit {
            id,
            merchant_id: 1,
            stall_id: 1,
            status,
            start_date: at(start),
            end_date: at(end),
            rejection_reason: None,
            requested_at: at(1),
            updated_at: None,
        }
    }

    #[test]
    fn test_transition_table() {
        use PermitStatus::*;
        let all = [Pending, Approved, Rejected, Expired, Cancelled];
        let allowed = [
            (Pending, Approved),
            (Pending, Rejected),
            (Pending, Cancelled),
            (Approved, Expired),
            (Approved, Cancelled),
        ];
        for from in all {
            for to in all {
                assert_eq!(
                    from.can_transition_to(to),
                    allowed.contains(&(from, to)),
                    "{} -> {}",
                    from,
                    to
                );
            }
        }
    }

    #[test]
    fn test_terminal_states_have_no_exit() {
        use PermitStatus::*;
        for from in [Rejected, Expired, Cancelled] {
            for to in [Pending, Approved, Rejected, Expired, Cancelled] {
                assert!(!from.can_transition_to(to));
            }
        }
        assert!(Pending.can_transition_to(Approved));
        assert!(Approved.can_transition_to(Cancelled));
    }

    #[test]
    fn test_overlap_is_inclusive() {
        let p = permit(1, PermitStatus::Approved, 10, 15);
        assert!(p.overlaps(at(15), at(20)));
        assert!(p.overlaps(at(5), at(10)));
        assert!(p.overlaps(at(11), at(12)));
        assert!(!p.overlaps(at(16), at(20)));
        assert!(!p.overlaps(at(2), at(9)));
    }

    #[test]
    fn test_find_overlap_only_counts_approved() {
        let permits = vec![
            permit(1, PermitStatus::Pending, 10, 15),
            permit(2, PermitStatus::Rejected, 10, 15),
            permit(3, PermitStatus::Cancelled, 10, 15),
        ];
        assert!(find_overlap(&permits, at(12), at(13), None).is_none());

        let permits = vec![permit(4, PermitStatus::Approved, 10, 15)];
        assert_eq!(find_overlap(&permits, at(12), at(13), None).map(|p| p.id), Some(4));
        assert!(find_overlap(&permits, at(12), at(13), Some(4)).is_none());
    }

    fn change(status: PermitStatus) -> PermitTransition {
        PermitTransition {
            status,
            rejection_reason: None,
        }
    }

    #[test]
    fn test_approval_rechecks_overlap_excluding_itself() {
        let target = permit(1, PermitStatus::Pending, 10, 15);
        let approved = permit(2, PermitStatus::Approved, 14, 20);

        let err = target
            .check_transition(&change(PermitStatus::Approved), [&target, &approved])
            .unwrap_err();
        assert!(matches!(err, AppError::Overlap { conflicting_permit_id: 2, .. }));

        // Rejeitar não depende de sobreposição
        assert!(target
            .check_transition(&change(PermitStatus::Rejected), [&target, &approved])
            .is_ok());
    }

    #[test]
    fn test_rejection_reason_requires_rejected() {
        let target = permit(1, PermitStatus::Pending, 10, 15);
        let mut c = change(PermitStatus::Cancelled);
        c.rejection_reason = Some("Documentos incompletos".into());
        let err = target.check_transition(&c, []).unwrap_err();
        assert!(matches!(err, AppError::InvalidField { field: "motivo_rechazo", .. }));

        c.status = PermitStatus::Rejected;
        assert!(target.check_transition(&c, []).is_ok());
    }

    #[test]
    fn test_terminal_permit_cannot_move() {
        let target = permit(1, PermitStatus::Rejected, 10, 15);
        let err = target.check_transition(&change(PermitStatus::Approved), []).unwrap_err();
        assert!(matches!(
            err,
            AppError::InvalidTransition { from: PermitStatus::Rejected, to: PermitStatus::Approved }
        ));
    }

    #[test]
    fn test_inverted_range_is_invalid() {
        let p = NewPermit {
            merchant_id: 1,
            stall_id: 1,
            start_date: at(12),
            end_date: at(11),
        };
        assert!(matches!(p.check_range(), Err(AppError::InvalidField { field: "fecha_fin", .. })));
    }

    #[test]
    fn test_is_overdue() {
        let p = permit(1, PermitStatus::Approved, 10, 15);
        assert!(p.is_overdue(at(16)));
        assert!(!p.is_overdue(at(15)));
        assert!(!permit(2, PermitStatus::Pending, 10, 15).is_overdue(at(20)));
    }

    #[test]
    fn test_status_accepts_legacy_names() {
        let s: PermitStatus = serde_json::from_str("\"APROBADO\"").unwrap();
        assert_eq!(s, PermitStatus::Approved);
        let s: PermitStatus = serde_json::from_str("\"CANCELLED\"").unwrap();
        assert_eq!(s, PermitStatus::Cancelled);
        assert_eq!(serde_json::to_string(&PermitStatus::Pending).unwrap(), "\"PENDING\"");
    }

    #[test]
    fn test_new_permit_accepts_date_inputs() {
        let p: NewPermit = serde_json::from_value(serde_json::json!({
            "comerciante_id": 1,
            "puesto_id": 2,
            "fecha_inicio": "2027-02-10",
            "fecha_fin": "2027-02-10"
        }))
        .unwrap();
        assert_eq!(p.start_date, at(10));
        assert_eq!(p.end_date, Utc.with_ymd_and_hms(2027, 2, 10, 23, 59, 59).unwrap());
    }

    #[test]
    fn test_new_permit_accepts_timestamps() {
        let p: NewPermit = serde_json::from_value(serde_json::json!({
            "comerciante_id": 1,
            "puesto_id": 2,
            "fecha_inicio": "2027-02-10T08:30:00-05:00",
            "fecha_fin": "2027-02-11T18:00"
        }))
        .unwrap();
        assert_eq!(p.start_date, Utc.with_ymd_and_hms(2027, 2, 10, 13, 30, 0).unwrap());
        assert_eq!(p.end_date, Utc.with_ymd_and_hms(2027, 2, 11, 18, 0, 0).unwrap());
    }

    #[test]
    fn test_new_permit_rejects_garbage_dates() {
        let result: Result<NewPermit, _> = serde_json::from_value(serde_json::json!({
            "comerciante_id": 1,
            "puesto_id": 2,
            "fecha_inicio": "mañana",
            "fecha_fin": "2027-02-11"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_merchant_changes_apply_only_present_fields() {
        let mut m = Merchant {
            id: 1,
            name: "Ana".into(),
            national_id: "123".into(),
            email: "ana@correo.com".into(),
            phone: "300".into(),
            active: true,
            registered_at: at(1),
        };
        m.apply_changes(&MerchantChanges {
            phone: Some("301".into()),
            active: Some(false),
            ..Default::default()
        });
        assert_eq!(m.name, "Ana");
        assert_eq!(m.phone, "301");
        assert!(!m.active);
    }
}
