//! Chapter 9: value types
//!
//! Embedded values are flattened into the owner's columns and compared by
//! value. Element collections live in their own tables keyed by the owner
//! and are rewritten as a whole whenever they change.

#![allow(clippy::result_large_err)]

use crate::chapter::{Chapter, ChapterReport};
use chrono::NaiveDate;
use ormstudy_core::{OrmStudyError, SqlValue};
use ormstudy_store::{sql_params, Entity, Migration, Result, SessionTx};
use rusqlite::types::Type;
use rusqlite::Row;

pub(crate) const SCHEMA: &[Migration] = &[Migration {
    id: "ch09_001_value_types",
    sql: include_str!("../schema/ch09.sql"),
}];

pub(crate) const TABLES: &[&str] = &[
    "CH09_ADDRESS",
    "CH09_FAVORITE_FOODS",
    "CH09_MEMBER",
    "CH09_PHONE_SERVICE_PROVIDER",
];

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Zipcode {
    pub zip: String,
    pub plus_four: String,
}

impl Zipcode {
    pub fn new(zip: &str) -> Self {
        Self {
            zip: zip.to_string(),
            plus_four: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    pub city: String,
    pub street: String,
    pub zipcode: Zipcode,
}

impl Address {
    pub fn new(city: &str, zip: &str) -> Self {
        Self {
            city: city.to_string(),
            street: String::new(),
            zipcode: Zipcode::new(zip),
        }
    }

    fn columns(address: Option<&Address>) -> [SqlValue; 4] {
        match address {
            Some(a) => [
                a.city.as_str().into(),
                a.street.as_str().into(),
                a.zipcode.zip.as_str().into(),
                a.zipcode.plus_four.as_str().into(),
            ],
            None => [SqlValue::Null, SqlValue::Null, SqlValue::Null, SqlValue::Null],
        }
    }

    /// All-null columns read back as no address
    fn from_columns(row: &Row<'_>, columns: [&str; 4]) -> rusqlite::Result<Option<Address>> {
        let city: Option<String> = row.get(columns[0])?;
        let street: Option<String> = row.get(columns[1])?;
        let zip: Option<String> = row.get(columns[2])?;
        let plus_four: Option<String> = row.get(columns[3])?;
        if city.is_none() && street.is_none() && zip.is_none() && plus_four.is_none() {
            return Ok(None);
        }
        Ok(Some(Address {
            city: city.unwrap_or_default(),
            street: street.unwrap_or_default(),
            zipcode: Zipcode {
                zip: zip.unwrap_or_default(),
                plus_four: plus_four.unwrap_or_default(),
            },
        }))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Period {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl Period {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date.map_or(true, |s| s <= date) && self.end_date.map_or(true, |e| date <= e)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhoneNumber {
    pub area_code: String,
    pub local_number: String,
    pub provider_id: Option<i64>,
}

/// Provider entity with nothing but a generated id
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhoneServiceProvider {
    pub id: Option<i64>,
}

impl Entity for PhoneServiceProvider {
    type Id = i64;
    const ENTITY_NAME: &'static str = "PhoneServiceProvider";
    const TABLE: &'static str = "CH09_PHONE_SERVICE_PROVIDER";
    const ID_COLUMN: &'static str = "ID";
    const COLUMNS: &'static [&'static str] = &[];

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn values(&self) -> Vec<SqlValue> {
        Vec::new()
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self { id: row.get("ID")? })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Member {
    pub id: Option<i64>,
    pub name: String,
    pub period: Period,
    pub home_address: Option<Address>,
    pub company_address: Option<Address>,
    pub phone_number: Option<PhoneNumber>,
    /// Element collection, stored in `CH09_FAVORITE_FOODS`
    pub favorite_foods: Vec<String>,
    /// Element collection, stored in `CH09_ADDRESS`
    pub address_history: Vec<Address>,
}

fn date_value(date: Option<NaiveDate>) -> SqlValue {
    date.map(|d| d.format(DATE_FORMAT).to_string()).into()
}

fn date_column(row: &Row<'_>, column: &str) -> rusqlite::Result<Option<NaiveDate>> {
    let text: Option<String> = row.get(column)?;
    text.map(|t| {
        NaiveDate::parse_from_str(&t, DATE_FORMAT).map_err(|_| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                Type::Text,
                Box::new(OrmStudyError::Conversion {
                    attribute: column.to_string(),
                    value: t.clone(),
                }),
            )
        })
    })
    .transpose()
}

impl Entity for Member {
    type Id = i64;
    const ENTITY_NAME: &'static str = "Member";
    const TABLE: &'static str = "CH09_MEMBER";
    const ID_COLUMN: &'static str = "ID";
    const COLUMNS: &'static [&'static str] = &[
        "NAME",
        "START_DATE",
        "END_DATE",
        "CITY",
        "STREET",
        "ZIP",
        "PLUS_FOUR",
        "COMPANY_CITY",
        "COMPANY_STREET",
        "COMPANY_ZIPCODE",
        "COMPANY_PLUS_FOUR",
        "AREA_CODE",
        "LOCAL_NUMBER",
        "PROVIDER_ID",
    ];

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn values(&self) -> Vec<SqlValue> {
        let mut values = vec![
            self.name.as_str().into(),
            date_value(self.period.start_date),
            date_value(self.period.end_date),
        ];
        values.extend(Address::columns(self.home_address.as_ref()));
        values.extend(Address::columns(self.company_address.as_ref()));
        match &self.phone_number {
            Some(p) => values.extend([
                p.area_code.as_str().into(),
                p.local_number.as_str().into(),
                p.provider_id.into(),
            ]),
            None => values.extend([SqlValue::Null, SqlValue::Null, SqlValue::Null]),
        }
        values
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let area_code: Option<String> = row.get("AREA_CODE")?;
        let local_number: Option<String> = row.get("LOCAL_NUMBER")?;
        let provider_id: Option<i64> = row.get("PROVIDER_ID")?;
        let phone_number = match (area_code, local_number) {
            (None, None) if provider_id.is_none() => None,
            (area_code, local_number) => Some(PhoneNumber {
                area_code: area_code.unwrap_or_default(),
                local_number: local_number.unwrap_or_default(),
                provider_id,
            }),
        };
        Ok(Self {
            id: row.get("ID")?,
            name: row.get("NAME")?,
            period: Period {
                start_date: date_column(row, "START_DATE")?,
                end_date: date_column(row, "END_DATE")?,
            },
            home_address: Address::from_columns(row, ["CITY", "STREET", "ZIP", "PLUS_FOUR"])?,
            company_address: Address::from_columns(
                row,
                [
                    "COMPANY_CITY",
                    "COMPANY_STREET",
                    "COMPANY_ZIPCODE",
                    "COMPANY_PLUS_FOUR",
                ],
            )?,
            phone_number,
            favorite_foods: Vec::new(),
            address_history: Vec::new(),
        })
    }
}

/// Persist the member row and both element collections
pub fn persist_member(tx: &SessionTx<'_>, member: &mut Member) -> Result<()> {
    tx.persist(member)?;
    let id = member.id.unwrap_or_default();
    replace_favorite_foods(tx, id, &member.favorite_foods)?;
    replace_address_history(tx, id, &member.address_history)
}

/// Collection rows have no identity, so a change rewrites the whole set
pub fn replace_favorite_foods(tx: &SessionTx<'_>, member_id: i64, foods: &[String]) -> Result<()> {
    tx.execute(
        "DELETE FROM CH09_FAVORITE_FOODS WHERE MEMBER_ID = ?",
        sql_params![member_id],
    )?;
    for food in foods {
        tx.execute(
            "INSERT INTO CH09_FAVORITE_FOODS (MEMBER_ID, FOOD_NAME) VALUES (?, ?)",
            sql_params![member_id, food.as_str()],
        )?;
    }
    Ok(())
}

pub fn replace_address_history(
    tx: &SessionTx<'_>,
    member_id: i64,
    history: &[Address],
) -> Result<()> {
    tx.execute(
        "DELETE FROM CH09_ADDRESS WHERE MEMBER_ID = ?",
        sql_params![member_id],
    )?;
    for address in history {
        tx.execute(
            "INSERT INTO CH09_ADDRESS (MEMBER_ID, CITY, STREET, ZIP, PLUS_FOUR) VALUES (?, ?, ?, ?, ?)",
            sql_params![
                member_id,
                address.city.as_str(),
                address.street.as_str(),
                address.zipcode.zip.as_str(),
                address.zipcode.plus_four.as_str()
            ],
        )?;
    }
    Ok(())
}

/// Member with both collections loaded
pub fn find_member(tx: &SessionTx<'_>, id: i64) -> Result<Option<Member>> {
    let Some(mut member) = tx.find::<Member>(id)? else {
        return Ok(None);
    };
    member.favorite_foods = tx.query_map(
        "SELECT FOOD_NAME FROM CH09_FAVORITE_FOODS WHERE MEMBER_ID = ? ORDER BY rowid",
        sql_params![id],
        |row| row.get(0),
    )?;
    member.address_history = tx.query_map(
        "SELECT * FROM CH09_ADDRESS WHERE MEMBER_ID = ? ORDER BY rowid",
        sql_params![id],
        |row| {
            Ok(Address::from_columns(row, ["CITY", "STREET", "ZIP", "PLUS_FOUR"])?
                .unwrap_or_else(|| Address::new("", "")))
        },
    )?;
    Ok(Some(member))
}

/// Cloning a value gives an independent copy
pub fn clone_member() -> (Address, Address) {
    let old = Address::new("Old City", "123");
    let mut new = old.clone();
    new.city = "New City".to_string();
    new.zipcode = Zipcode::new("456");
    (old, new)
}

/// Value types compare by content
pub fn compare_value() -> (bool, bool) {
    let a = 10;
    let b = 10;
    let address1 = Address::new("City", "123");
    let address2 = Address::new("City", "123");
    (a == b, address1 == address2)
}

pub fn save_collection(tx: &SessionTx<'_>) -> Result<i64> {
    let mut provider = PhoneServiceProvider::default();
    tx.persist(&mut provider)?;

    let mut member = Member {
        name: "회원1".to_string(),
        period: Period {
            start_date: NaiveDate::from_ymd_opt(2021, 1, 1),
            end_date: NaiveDate::from_ymd_opt(2021, 12, 31),
        },
        home_address: Some(Address::new("통영", "123")),
        company_address: Some(Address {
            city: "서울".to_string(),
            street: "테헤란로".to_string(),
            zipcode: Zipcode {
                zip: "06234".to_string(),
                plus_four: "0001".to_string(),
            },
        }),
        phone_number: Some(PhoneNumber {
            area_code: "02".to_string(),
            local_number: "1234-5678".to_string(),
            provider_id: provider.id,
        }),
        favorite_foods: vec!["짬뽕".to_string(), "짜장".to_string(), "탕수육".to_string()],
        address_history: vec![Address::new("강남", "000"), Address::new("강북", "111")],
        ..Member::default()
    };
    persist_member(tx, &mut member)?;
    Ok(member.id.unwrap_or_default())
}

pub fn run(tx: &SessionTx<'_>) -> Result<ChapterReport> {
    let mut report = ChapterReport::new(Chapter::Ch09);

    let (member1, member2) = clone_member();
    report.log(format!("member1.city = {}", member1.city));
    report.log(format!("member2.city = {}", member2.city));

    let (ints, addresses) = compare_value();
    report.log(format!("{}", ints));
    report.log(format!("{}", addresses));

    let id = save_collection(tx)?;
    if let Some(member) = find_member(tx, id)? {
        for food in &member.favorite_foods {
            report.log(format!("favoriteFood = {}", food));
        }
        if let Some(first) = member.address_history.first() {
            report.log(format!("addressHistory = {}", first.city));
        }

        let mut foods = member.favorite_foods.clone();
        foods.retain(|f| f != "탕수육");
        foods.push("치킨".to_string());
        replace_favorite_foods(tx, id, &foods)?;
        report.log(format!("favoriteFoods after replace = {}", foods.join(", ")));
    }
    Ok(report)
}
