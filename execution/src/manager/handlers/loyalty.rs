use super::super::*;
use super::{require_address, require_positive};
use nhbchain_types::Address;
use tracing::debug;

fn require_day(day: &str) -> Result<(), Error> {
    if day.trim().is_empty() {
        return Err(Error::InvalidArgument("day required"));
    }
    Ok(())
}

fn require_program(program: &str) -> Result<(), Error> {
    if program.trim().is_empty() {
        return Err(Error::InvalidArgument("program required"));
    }
    Ok(())
}

impl<S: State> Manager<S> {
    async fn meter(&self, key: Key) -> Result<Natural, Error> {
        store::get_amount(&self.state, &key).await
    }

    async fn set_meter(&mut self, key: Key, amount: Natural) -> Result<(), Error> {
        store::put(&mut self.state, key, amount).await
    }

    // === Base rewards ===

    pub async fn loyalty_base_daily(&self, day: &str, address: &Address) -> Result<Natural, Error> {
        require_day(day)?;
        require_address(address)?;
        self.meter(Key::LoyaltyBaseDaily(day.to_string(), *address))
            .await
    }

    pub async fn set_loyalty_base_daily(
        &mut self,
        day: &str,
        address: &Address,
        amount: Natural,
    ) -> Result<(), Error> {
        require_day(day)?;
        require_address(address)?;
        self.set_meter(Key::LoyaltyBaseDaily(day.to_string(), *address), amount)
            .await
    }

    pub async fn loyalty_base_total(&self, address: &Address) -> Result<Natural, Error> {
        require_address(address)?;
        self.meter(Key::LoyaltyBaseTotal(*address)).await
    }

    pub async fn set_loyalty_base_total(
        &mut self,
        address: &Address,
        amount: Natural,
    ) -> Result<(), Error> {
        require_address(address)?;
        self.set_meter(Key::LoyaltyBaseTotal(*address), amount)
            .await
    }

    // === Programs ===

    pub async fn loyalty_program_daily(
        &self,
        program: &str,
        day: &str,
        address: &Address,
    ) -> Result<Natural, Error> {
        require_program(program)?;
        require_day(day)?;
        require_address(address)?;
        self.meter(Key::LoyaltyProgramDaily(
            program.to_string(),
            day.to_string(),
            *address,
        ))
        .await
    }

    pub async fn set_loyalty_program_daily(
        &mut self,
        program: &str,
        day: &str,
        address: &Address,
        amount: Natural,
    ) -> Result<(), Error> {
        require_program(program)?;
        require_day(day)?;
        require_address(address)?;
        self.set_meter(
            Key::LoyaltyProgramDaily(program.to_string(), day.to_string(), *address),
            amount,
        )
        .await
    }

    pub async fn loyalty_program_daily_total(
        &self,
        program: &str,
        day: &str,
    ) -> Result<Natural, Error> {
        require_program(program)?;
        require_day(day)?;
        self.meter(Key::LoyaltyProgramDailyTotal(
            program.to_string(),
            day.to_string(),
        ))
        .await
    }

    pub async fn set_loyalty_program_daily_total(
        &mut self,
        program: &str,
        day: &str,
        amount: Natural,
    ) -> Result<(), Error> {
        require_program(program)?;
        require_day(day)?;
        self.set_meter(
            Key::LoyaltyProgramDailyTotal(program.to_string(), day.to_string()),
            amount,
        )
        .await
    }

    pub async fn loyalty_program_epoch(&self, program: &str, epoch: u64) -> Result<Natural, Error> {
        require_program(program)?;
        self.meter(Key::LoyaltyProgramEpoch(program.to_string(), epoch))
            .await
    }

    pub async fn set_loyalty_program_epoch(
        &mut self,
        program: &str,
        epoch: u64,
        amount: Natural,
    ) -> Result<(), Error> {
        require_program(program)?;
        self.set_meter(Key::LoyaltyProgramEpoch(program.to_string(), epoch), amount)
            .await
    }

    pub async fn loyalty_program_issuance(
        &self,
        program: &str,
        address: &Address,
    ) -> Result<Natural, Error> {
        require_program(program)?;
        require_address(address)?;
        self.meter(Key::LoyaltyProgramIssuance(program.to_string(), *address))
            .await
    }

    pub async fn set_loyalty_program_issuance(
        &mut self,
        program: &str,
        address: &Address,
        amount: Natural,
    ) -> Result<(), Error> {
        require_program(program)?;
        require_address(address)?;
        self.set_meter(
            Key::LoyaltyProgramIssuance(program.to_string(), *address),
            amount,
        )
        .await
    }

    /// Counts a program reward against the recipient's daily meter, the program's daily total
    /// and the recipient's lifetime issuance together.
    pub async fn record_program_reward(
        &mut self,
        program: &str,
        day: &str,
        address: &Address,
        amount: Natural,
    ) -> Result<(), Error> {
        require_positive(&amount)?;
        let daily = self.loyalty_program_daily(program, day, address).await? + &amount;
        let total = self.loyalty_program_daily_total(program, day).await? + &amount;
        let issued = self.loyalty_program_issuance(program, address).await? + &amount;

        let mut journal = Journal::new();
        let result: Result<(), Error> = async {
            self.write(
                &mut journal,
                Key::LoyaltyProgramDaily(program.to_string(), day.to_string(), *address),
                daily,
            )
            .await?;
            self.write(
                &mut journal,
                Key::LoyaltyProgramDailyTotal(program.to_string(), day.to_string()),
                total,
            )
            .await?;
            self.write(
                &mut journal,
                Key::LoyaltyProgramIssuance(program.to_string(), *address),
                issued,
            )
            .await
        }
        .await;
        self.commit(journal, result).await?;
        debug!(program, day, %address, %amount, "program reward recorded");
        Ok(())
    }
}
