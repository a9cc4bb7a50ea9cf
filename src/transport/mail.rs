// Copyright 2016 Claus Matzinger
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//    http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials as SmtpCredentials;
use lettre::{Message, SmtpTransport, Transport};

use crate::config::{Credentials, MailSettings};
use crate::datasink::Mailer;
use crate::error::MailError;

/// Sends plain-text mail over an implicit-TLS SMTP submission session.
/// Sender and recipient are fixed for the life of the process.
pub struct SmtpMailer {
    transport: SmtpTransport,
    from: Mailbox,
    to: Mailbox,
}

impl SmtpMailer {
    pub fn new(settings: &MailSettings, credentials: &Credentials, recipient: &str) -> Result<SmtpMailer, MailError> {
        let transport = SmtpTransport::relay(&settings.smtp_host)?
            .port(settings.smtp_port)
            .credentials(SmtpCredentials::new(
                credentials.mail_user.clone(),
                credentials.mail_password.clone(),
            ))
            .build();
        Ok(SmtpMailer {
            transport,
            from: credentials.mail_user.parse()?,
            to: recipient.parse()?,
        })
    }
}

impl Mailer for SmtpMailer {
    fn send(&self, subject: &str, body: &str) -> Result<(), MailError> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_owned())
            .map_err(|e| MailError::Build(e.to_string()))?;
        self.transport.send(&message)?;
        debug!("Mail delivered to {}", self.to);
        Ok(())
    }
}
