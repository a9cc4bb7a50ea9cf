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

use std::time::Duration;

use reqwest::blocking::Client;

use crate::datasink::{VoiceCall, VoiceCaller};
use crate::error::CallError;

/// Places calls through a Twilio-compatible REST API.
pub struct TwilioCaller {
    client: Client,
    calls_url: String,
    account_sid: String,
    auth_token: String,
}

impl TwilioCaller {
    pub fn new(api_base: &str, account_sid: &str, auth_token: &str, timeout: Duration) -> Result<TwilioCaller, CallError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(TwilioCaller {
            client,
            calls_url: calls_url(api_base, account_sid),
            account_sid: account_sid.to_owned(),
            auth_token: auth_token.to_owned(),
        })
    }
}

fn calls_url(api_base: &str, account_sid: &str) -> String {
    format!(
        "{}/2010-04-01/Accounts/{}/Calls.json",
        api_base.trim_end_matches('/'),
        account_sid
    )
}

impl VoiceCaller for TwilioCaller {
    fn place_call(&self, call: &VoiceCall) -> Result<(), CallError> {
        let params = [
            ("To", call.to.as_str()),
            ("From", call.from.as_str()),
            ("Twiml", call.twiml.as_str()),
        ];
        let response = self
            .client
            .post(&self.calls_url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&params)
            .send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(CallError::Rejected {
                status: status.as_u16(),
                body: response.text().unwrap_or_default(),
            });
        }
        Ok(())
    }
}
