use crate::error::FormError;
use crate::models::{Client, ClientDraft, ClientRef, ClientStatus, Deal, DealDraft, DealStage};

/// Editable field state behind a create or edit popup.
///
/// Text fields take whatever the user types; enumerated fields are changed
/// with [`EntityForm::cycle`]. Nothing is parsed until [`EntityForm::to_draft`].
pub trait EntityForm: Clone + Default + Send + Sync {
    type Field: Copy + PartialEq + Send + Sync + 'static;
    type Record;
    type Draft;

    const FIELDS: &'static [Self::Field];

    fn label(field: Self::Field) -> &'static str;

    fn is_choice(field: Self::Field) -> bool;

    fn value(&self, field: Self::Field) -> String;

    fn set_field(&mut self, field: Self::Field, value: String);

    fn cycle(&mut self, field: Self::Field, forward: bool);

    fn load(&mut self, record: &Self::Record);

    fn reset(&mut self);

    fn to_draft(&self) -> Result<Self::Draft, FormError>;
}

fn step<T: PartialEq + Clone>(choices: &[T], current: &T, forward: bool) -> Option<T> {
    if choices.is_empty() {
        return None;
    }
    let next = match choices.iter().position(|c| c == current) {
        Some(i) if forward => (i + 1) % choices.len(),
        Some(i) => (i + choices.len() - 1) % choices.len(),
        None => 0,
    };
    Some(choices[next].clone())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClientField {
    Name,
    Email,
    Phone,
    Company,
    Status,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClientForm {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub company: String,
    pub status: ClientStatus,
}

impl EntityForm for ClientForm {
    type Field = ClientField;
    type Record = Client;
    type Draft = ClientDraft;

    const FIELDS: &'static [ClientField] = &[
        ClientField::Name,
        ClientField::Email,
        ClientField::Phone,
        ClientField::Company,
        ClientField::Status,
    ];

    fn label(field: ClientField) -> &'static str {
        match field {
            ClientField::Name => "Name",
            ClientField::Email => "Email",
            ClientField::Phone => "Phone",
            ClientField::Company => "Company",
            ClientField::Status => "Status",
        }
    }

    fn is_choice(field: ClientField) -> bool {
        field == ClientField::Status
    }

    fn value(&self, field: ClientField) -> String {
        match field {
            ClientField::Name => self.name.clone(),
            ClientField::Email => self.email.clone(),
            ClientField::Phone => self.phone.clone(),
            ClientField::Company => self.company.clone(),
            ClientField::Status => self.status.label().to_string(),
        }
    }

    fn set_field(&mut self, field: ClientField, value: String) {
        match field {
            ClientField::Name => self.name = value,
            ClientField::Email => self.email = value,
            ClientField::Phone => self.phone = value,
            ClientField::Company => self.company = value,
            ClientField::Status => self.status = ClientStatus::from(value),
        }
    }

    fn cycle(&mut self, field: ClientField, forward: bool) {
        if field == ClientField::Status {
            if let Some(next) = step(&ClientStatus::CHOICES, &self.status, forward) {
                self.status = next;
            }
        }
    }

    fn load(&mut self, client: &Client) {
        self.name = client.name.clone();
        self.email = client.email.clone();
        self.phone = client.phone.clone();
        self.company = client.company.clone();
        self.status = client.status.clone();
    }

    fn reset(&mut self) {
        *self = ClientForm::default();
    }

    fn to_draft(&self) -> Result<ClientDraft, FormError> {
        if self.name.trim().is_empty() {
            return Err(FormError::Required("name"));
        }
        Ok(ClientDraft {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            phone: self.phone.trim().to_string(),
            company: self.company.trim().to_string(),
            status: self.status.clone(),
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DealField {
    Title,
    Client,
    Amount,
    Stage,
    Description,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct DealForm {
    pub title: String,
    pub client_id: String,
    pub amount: String,
    pub stage: DealStage,
    pub description: String,
    // Survives reset and load; refreshed whenever the deals screen mounts
    client_choices: Vec<ClientRef>,
}

impl DealForm {
    pub fn set_client_choices(&mut self, choices: Vec<ClientRef>) {
        self.client_choices = choices;
    }

    pub fn client_choices(&self) -> &[ClientRef] {
        &self.client_choices
    }

    fn selected_client(&self) -> Option<&ClientRef> {
        let id = self.client_id.trim().parse::<u64>().ok()?;
        self.client_choices.iter().find(|c| c.id == id)
    }
}

impl EntityForm for DealForm {
    type Field = DealField;
    type Record = Deal;
    type Draft = DealDraft;

    const FIELDS: &'static [DealField] = &[
        DealField::Title,
        DealField::Client,
        DealField::Amount,
        DealField::Stage,
        DealField::Description,
    ];

    fn label(field: DealField) -> &'static str {
        match field {
            DealField::Title => "Title",
            DealField::Client => "Client",
            DealField::Amount => "Amount",
            DealField::Stage => "Stage",
            DealField::Description => "Description",
        }
    }

    fn is_choice(field: DealField) -> bool {
        matches!(field, DealField::Client | DealField::Stage)
    }

    fn value(&self, field: DealField) -> String {
        match field {
            DealField::Title => self.title.clone(),
            DealField::Client => match self.selected_client() {
                Some(client) => client.name.clone(),
                None if self.client_id.is_empty() => String::new(),
                None => format!("#{}", self.client_id),
            },
            DealField::Amount => self.amount.clone(),
            DealField::Stage => self.stage.label().to_string(),
            DealField::Description => self.description.clone(),
        }
    }

    fn set_field(&mut self, field: DealField, value: String) {
        match field {
            DealField::Title => self.title = value,
            DealField::Client => self.client_id = value,
            DealField::Amount => self.amount = value,
            DealField::Stage => self.stage = DealStage::from(value),
            DealField::Description => self.description = value,
        }
    }

    fn cycle(&mut self, field: DealField, forward: bool) {
        match field {
            DealField::Stage => {
                if let Some(next) = step(&DealStage::CHOICES, &self.stage, forward) {
                    self.stage = next;
                }
            }
            DealField::Client => {
                let ids: Vec<u64> = self.client_choices.iter().map(|c| c.id).collect();
                let current = self.client_id.trim().parse::<u64>().unwrap_or(0);
                if let Some(next) = step(&ids, &current, forward) {
                    self.client_id = next.to_string();
                }
            }
            _ => {}
        }
    }

    fn load(&mut self, deal: &Deal) {
        self.title = deal.title.clone();
        self.client_id = deal.client.id.to_string();
        self.amount = deal.amount.to_string();
        self.stage = deal.stage.clone();
        self.description = deal.description.clone();
        if !self.client_choices.iter().any(|c| c.id == deal.client.id) {
            self.client_choices.push(deal.client.clone());
        }
    }

    fn reset(&mut self) {
        let choices = std::mem::take(&mut self.client_choices);
        *self = DealForm {
            client_choices: choices,
            ..DealForm::default()
        };
    }

    fn to_draft(&self) -> Result<DealDraft, FormError> {
        let client_id = self
            .client_id
            .trim()
            .parse::<u64>()
            .map_err(|_| FormError::InvalidNumber {
                field: "client",
                value: self.client_id.clone(),
            })?;
        let amount = self
            .amount
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|a| a.is_finite())
            .ok_or_else(|| FormError::InvalidNumber {
                field: "amount",
                value: self.amount.clone(),
            })?;

        Ok(DealDraft {
            title: self.title.trim().to_string(),
            client_id,
            amount,
            stage: self.stage.clone(),
            description: self.description.clone(),
        })
    }
}
